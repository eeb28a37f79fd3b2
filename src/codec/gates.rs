//! Protocol version gates
//!
//! Every optional field of the frame and model definition formats is listed
//! once in [`FIELD_GATES`], in wire order, with the version range that
//! carries it. Decoders and encoders evaluate the table against an explicit
//! [`ProtocolVersion`] through a [`FieldSet`] computed once per packet.

use crate::ProtocolVersion;

/// A field whose presence depends on the protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GatedField {
    /// Per rigid body marker positions
    RigidBodyMarkers,
    /// Marker ids and sizes following the rigid body marker positions
    RigidBodyMarkerDetails,
    /// Rigid body mean marker error
    MeanMarkerError,
    /// Rigid body params word with the tracking-valid bit
    TrackingValid,
    Skeletons,
    LabeledMarkers,
    /// Occluded / point cloud / model solved bits
    LabeledMarkerParams,
    /// Has model / unlabeled / active bits
    LabeledMarkerExtendedParams,
    LabeledMarkerResidual,
    ForcePlates,
    Devices,
    SoftwareLatency,
    /// `f64` timestamp instead of `f32`
    DoubleTimestamp,
    HighResTimestamps,
    /// Names of rigid body and bone descriptors
    DescriptorNames,
    /// Expected marker layout of rigid body descriptors
    DescriptorMarkers,
}

/// Version range in which a field is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Present at this version and later
    Since { major: u8, minor: u8 },
    /// Present only before this major version
    BeforeMajor(u8),
}

impl Availability {
    pub const fn allows(self, version: ProtocolVersion) -> bool {
        match self {
            Availability::Since { major, minor } => version.at_least(major, minor),
            Availability::BeforeMajor(major) => version.major < major,
        }
    }
}

const fn since(major: u8, minor: u8) -> Availability {
    Availability::Since { major, minor }
}

/// Every gated field with its availability, in wire order.
pub const FIELD_GATES: &[(GatedField, Availability)] = &[
    (GatedField::RigidBodyMarkers, Availability::BeforeMajor(3)),
    (GatedField::RigidBodyMarkerDetails, since(2, 0)),
    (GatedField::MeanMarkerError, since(2, 0)),
    (GatedField::TrackingValid, since(2, 6)),
    (GatedField::Skeletons, since(2, 1)),
    (GatedField::LabeledMarkers, since(2, 3)),
    (GatedField::LabeledMarkerParams, since(2, 6)),
    (GatedField::LabeledMarkerExtendedParams, since(3, 0)),
    (GatedField::LabeledMarkerResidual, since(3, 0)),
    (GatedField::ForcePlates, since(2, 9)),
    (GatedField::Devices, since(2, 11)),
    (GatedField::SoftwareLatency, Availability::BeforeMajor(3)),
    (GatedField::DoubleTimestamp, since(2, 7)),
    (GatedField::HighResTimestamps, since(3, 0)),
    (GatedField::DescriptorNames, since(2, 0)),
    (GatedField::DescriptorMarkers, since(3, 0)),
];

/// The set of gated fields present at one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet(u32);

impl FieldSet {
    pub fn for_version(version: ProtocolVersion) -> Self {
        let bits = FIELD_GATES
            .iter()
            .filter(|(_, availability)| availability.allows(version))
            .fold(0u32, |bits, (field, _)| bits | (1 << *field as u8));
        Self(bits)
    }

    pub const fn has(self, field: GatedField) -> bool {
        self.0 & (1 << field as u8) != 0
    }
}

impl ProtocolVersion {
    /// Whether packets at this version carry `field`.
    pub fn supports(self, field: GatedField) -> bool {
        FieldSet::for_version(self).has(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn every_field_is_listed_once() {
        let all = [
            GatedField::RigidBodyMarkers,
            GatedField::RigidBodyMarkerDetails,
            GatedField::MeanMarkerError,
            GatedField::TrackingValid,
            GatedField::Skeletons,
            GatedField::LabeledMarkers,
            GatedField::LabeledMarkerParams,
            GatedField::LabeledMarkerExtendedParams,
            GatedField::LabeledMarkerResidual,
            GatedField::ForcePlates,
            GatedField::Devices,
            GatedField::SoftwareLatency,
            GatedField::DoubleTimestamp,
            GatedField::HighResTimestamps,
            GatedField::DescriptorNames,
            GatedField::DescriptorMarkers,
        ];
        for field in all {
            let listed = FIELD_GATES.iter().filter(|(f, _)| *f == field).count();
            assert_eq!(listed, 1, "{field:?} listed {listed} times");
        }
        assert_eq!(FIELD_GATES.len(), all.len());
    }

    #[test]
    fn boundaries() {
        let v = ProtocolVersion::new;
        assert!(!v(2, 5, 0, 0).supports(GatedField::TrackingValid));
        assert!(v(2, 6, 0, 0).supports(GatedField::TrackingValid));
        assert!(!v(2, 8, 0, 0).supports(GatedField::ForcePlates));
        assert!(v(2, 9, 0, 0).supports(GatedField::ForcePlates));
        assert!(!v(2, 10, 0, 0).supports(GatedField::Devices));
        assert!(v(2, 11, 0, 0).supports(GatedField::Devices));
        assert!(v(2, 11, 0, 0).supports(GatedField::RigidBodyMarkers));
        assert!(!v(3, 0, 0, 0).supports(GatedField::RigidBodyMarkers));
        assert!(!v(3, 0, 0, 0).supports(GatedField::SoftwareLatency));
        assert!(v(3, 0, 0, 0).supports(GatedField::HighResTimestamps));
        assert!(!v(1, 9, 0, 0).supports(GatedField::MeanMarkerError));
    }

    #[test]
    fn unnegotiated_version_carries_only_legacy_fields() {
        let fields = FieldSet::for_version(ProtocolVersion::UNNEGOTIATED);
        assert!(fields.has(GatedField::RigidBodyMarkers));
        assert!(fields.has(GatedField::SoftwareLatency));
        assert!(!fields.has(GatedField::Skeletons));
        assert!(!fields.has(GatedField::DoubleTimestamp));
    }

    proptest! {
        #[test]
        fn gates_are_monotonic(
            a in any::<[u8; 4]>(),
            b in any::<[u8; 4]>(),
        ) {
            let (lo, hi) = {
                let (a, b) = (ProtocolVersion::from_bytes(a), ProtocolVersion::from_bytes(b));
                if a <= b { (a, b) } else { (b, a) }
            };
            for (field, availability) in FIELD_GATES {
                match availability {
                    Availability::Since { .. } => {
                        prop_assert!(!lo.supports(*field) || hi.supports(*field), "{:?}", field);
                    }
                    Availability::BeforeMajor(_) => {
                        prop_assert!(!hi.supports(*field) || lo.supports(*field), "{:?}", field);
                    }
                }
            }
        }
    }
}
