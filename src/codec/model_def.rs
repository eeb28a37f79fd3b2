//! Model definition (data description) payload codec
//!
//! A count of datasets, each introduced by a type tag: 0 marker set,
//! 1 rigid body, 2 skeleton. An unknown tag aborts the packet since the
//! size of the unknown dataset cannot be skipped.

use super::cursor::{PayloadReader, PayloadWriter};
use super::gates::{FieldSet, GatedField};
use crate::{
    BoneDescriptor, Descriptor, MarkerSetDescriptor, NatNetError, ProtocolVersion, Result,
    RigidBodyDescriptor, RigidBodyMarkerDescriptor, SkeletonDescriptor,
};

const TAG_MARKER_SET: i32 = 0;
const TAG_RIGID_BODY: i32 = 1;
const TAG_SKELETON: i32 = 2;

/// Id, parent id and offset
const MIN_BONE_SIZE: usize = 4 + 4 + 12;

pub fn decode_model_definition(payload: &[u8], version: ProtocolVersion) -> Result<Vec<Descriptor>> {
    let fields = FieldSet::for_version(version);
    let mut r = PayloadReader::new(payload);

    let count = r.count("dataset count", 4)?;
    let mut descriptors = Vec::with_capacity(count);
    for _ in 0..count {
        let descriptor = match r.i32("dataset type")? {
            TAG_MARKER_SET => Descriptor::MarkerSet(read_marker_set(&mut r)?),
            TAG_RIGID_BODY => Descriptor::RigidBody(read_rigid_body(&mut r, fields)?),
            TAG_SKELETON => Descriptor::Skeleton(read_skeleton(&mut r, fields)?),
            type_tag => return Err(NatNetError::UnknownDescriptor { type_tag }),
        };
        descriptors.push(descriptor);
    }
    Ok(descriptors)
}

fn read_marker_set(r: &mut PayloadReader<'_>) -> Result<MarkerSetDescriptor> {
    let name = r.cstring("marker set name")?;
    let count = r.count("marker name count", 1)?;
    let marker_names = (0..count).map(|_| r.cstring("marker name")).collect::<Result<_>>()?;
    Ok(MarkerSetDescriptor { name, marker_names })
}

fn read_rigid_body(r: &mut PayloadReader<'_>, fields: FieldSet) -> Result<RigidBodyDescriptor> {
    let name = if fields.has(GatedField::DescriptorNames) {
        Some(r.cstring("rigid body name")?)
    } else {
        None
    };
    let id = r.i32("rigid body id")?;
    let parent_id = r.i32("rigid body parent id")?;
    let offset = r.vec3("rigid body offset")?;

    let markers = if fields.has(GatedField::DescriptorMarkers) {
        let count = r.count("rigid body marker count", 12 + 4)?;
        let positions = (0..count)
            .map(|_| r.vec3("rigid body marker offset"))
            .collect::<Result<Vec<_>>>()?;
        let labels = (0..count)
            .map(|_| r.i32("rigid body marker label"))
            .collect::<Result<Vec<_>>>()?;
        positions
            .into_iter()
            .zip(labels)
            .map(|(position, required_label)| RigidBodyMarkerDescriptor { position, required_label })
            .collect()
    } else {
        Vec::new()
    };

    Ok(RigidBodyDescriptor { name, id, parent_id, offset, markers })
}

fn read_skeleton(r: &mut PayloadReader<'_>, fields: FieldSet) -> Result<SkeletonDescriptor> {
    let name = r.cstring("skeleton name")?;
    let id = r.i32("skeleton id")?;
    let count = r.count("skeleton bone count", MIN_BONE_SIZE)?;
    let bones = (0..count)
        .map(|_| -> Result<BoneDescriptor> {
            let name = if fields.has(GatedField::DescriptorNames) {
                Some(r.cstring("bone name")?)
            } else {
                None
            };
            Ok(BoneDescriptor {
                name,
                id: r.i32("bone id")?,
                parent_id: r.i32("bone parent id")?,
                offset: r.vec3("bone offset")?,
            })
        })
        .collect::<Result<_>>()?;
    Ok(SkeletonDescriptor { name, id, bones })
}

/// Encode descriptors as sent at `version`. Names are dropped below 2.0 and
/// rigid body marker layouts below 3.0.
pub fn encode_model_definition(descriptors: &[Descriptor], version: ProtocolVersion) -> Vec<u8> {
    let fields = FieldSet::for_version(version);
    let names = fields.has(GatedField::DescriptorNames);
    let mut w = PayloadWriter::with_capacity(64 * descriptors.len().max(1));

    w.count(descriptors.len());
    for descriptor in descriptors {
        w.i32(descriptor.type_tag());
        match descriptor {
            Descriptor::MarkerSet(set) => {
                w.cstring(&set.name).count(set.marker_names.len());
                for marker in &set.marker_names {
                    w.cstring(marker);
                }
            }
            Descriptor::RigidBody(body) => {
                if names {
                    w.cstring(body.name.as_deref().unwrap_or_default());
                }
                w.i32(body.id).i32(body.parent_id).vec3(body.offset);
                if fields.has(GatedField::DescriptorMarkers) {
                    w.count(body.markers.len());
                    for marker in &body.markers {
                        w.vec3(marker.position);
                    }
                    for marker in &body.markers {
                        w.i32(marker.required_label);
                    }
                }
            }
            Descriptor::Skeleton(skeleton) => {
                w.cstring(&skeleton.name).i32(skeleton.id).count(skeleton.bones.len());
                for bone in &skeleton.bones {
                    if names {
                        w.cstring(bone.name.as_deref().unwrap_or_default());
                    }
                    w.i32(bone.id).i32(bone.parent_id).vec3(bone.offset);
                }
            }
        }
    }
    w.into_bytes()
}
