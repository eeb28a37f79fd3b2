//! Frame-of-data payload codec
//!
//! The payload is a sequence of count-prefixed groups in fixed order:
//! marker sets, unlabeled markers, rigid bodies, skeletons, labeled markers,
//! force plates and devices, followed by latency, timecode, timestamps,
//! frame flags and an end-of-data tag. Which groups and per-element fields
//! are present is decided by the [`FieldSet`] of the negotiated version.

use super::cursor::{PayloadReader, PayloadWriter};
use super::gates::{FieldSet, GatedField};
use crate::{
    AnalogDeviceSample, FrameFlags, FrameOfData, HighResTimestamps, LabeledMarkerSample, MarkerId,
    MarkerParams, MarkerSetSample, ProtocolVersion, Quaternion, Result, RigidBodyMarker,
    RigidBodySample, SkeletonSample, Timecode, Vec3,
};

const VEC3_SIZE: usize = 12;
/// NUL terminator plus marker count
const MIN_MARKER_SET_SIZE: usize = 1 + 4;
/// Id, position and orientation
const MIN_RIGID_BODY_SIZE: usize = 4 + VEC3_SIZE + 16;
/// Id and rigid body count
const MIN_SKELETON_SIZE: usize = 4 + 4;
/// Id and channel count
const MIN_ANALOG_DEVICE_SIZE: usize = 4 + 4;
/// Sample count
const MIN_ANALOG_CHANNEL_SIZE: usize = 4;

/// Value written for the end-of-data tag.
pub const END_OF_DATA_TAG: i32 = 0;

fn gated<T>(present: bool, read: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
    if present { read().map(Some) } else { Ok(None) }
}

/// Decode a frame-of-data payload under `version`.
pub fn decode_frame(payload: &[u8], version: ProtocolVersion) -> Result<FrameOfData> {
    let fields = FieldSet::for_version(version);
    let mut r = PayloadReader::new(payload);

    let frame_number = r.i32("frame number")?;

    let count = r.count("marker set count", MIN_MARKER_SET_SIZE)?;
    let mut marker_sets = Vec::with_capacity(count);
    for _ in 0..count {
        let name = r.cstring("marker set name")?;
        let markers = read_points(&mut r, "marker set markers")?;
        marker_sets.push(MarkerSetSample { name, markers });
    }

    let unlabeled_markers = read_points(&mut r, "unlabeled markers")?;

    let rigid_bodies = read_rigid_bodies(&mut r, fields, "rigid body count")?;

    let skeletons = if fields.has(GatedField::Skeletons) {
        let count = r.count("skeleton count", MIN_SKELETON_SIZE)?;
        let mut skeletons = Vec::with_capacity(count);
        for _ in 0..count {
            let id = r.i32("skeleton id")?;
            let rigid_bodies = read_rigid_bodies(&mut r, fields, "skeleton rigid body count")?;
            skeletons.push(SkeletonSample { id, rigid_bodies });
        }
        skeletons
    } else {
        Vec::new()
    };

    let labeled_markers = if fields.has(GatedField::LabeledMarkers) {
        read_labeled_markers(&mut r, fields)?
    } else {
        Vec::new()
    };

    let force_plates = if fields.has(GatedField::ForcePlates) {
        read_analog_devices(&mut r, "force plate count")?
    } else {
        Vec::new()
    };
    let devices = if fields.has(GatedField::Devices) {
        read_analog_devices(&mut r, "device count")?
    } else {
        Vec::new()
    };

    let software_latency =
        gated(fields.has(GatedField::SoftwareLatency), || r.f32("software latency"))?;

    let timecode = Timecode::from_raw(r.u32("timecode")?, r.u32("timecode subframe")?);

    let timestamp = if fields.has(GatedField::DoubleTimestamp) {
        r.f64("timestamp")?
    } else {
        f64::from(r.f32("timestamp")?)
    };

    let high_res_timestamps = gated(fields.has(GatedField::HighResTimestamps), || {
        Ok(HighResTimestamps {
            mid_exposure: r.u64("mid-exposure timestamp")?,
            data_received: r.u64("data received timestamp")?,
            transmit: r.u64("transmit timestamp")?,
        })
    })?;

    let flags = FrameFlags::from_bits(r.u16("frame flags")?);
    r.i32("end of data tag")?;

    Ok(FrameOfData {
        frame_number,
        marker_sets,
        unlabeled_markers,
        rigid_bodies,
        skeletons,
        labeled_markers,
        force_plates,
        devices,
        software_latency,
        timecode,
        timestamp,
        high_res_timestamps,
        flags,
    })
}

fn read_points(r: &mut PayloadReader<'_>, context: &'static str) -> Result<Vec<Vec3>> {
    let count = r.count(context, VEC3_SIZE)?;
    (0..count).map(|_| r.vec3(context)).collect()
}

fn read_rigid_bodies(
    r: &mut PayloadReader<'_>,
    fields: FieldSet,
    context: &'static str,
) -> Result<Vec<RigidBodySample>> {
    let count = r.count(context, MIN_RIGID_BODY_SIZE)?;
    (0..count).map(|_| read_rigid_body(r, fields)).collect()
}

fn read_rigid_body(r: &mut PayloadReader<'_>, fields: FieldSet) -> Result<RigidBodySample> {
    let id = r.i32("rigid body id")?;
    let position = r.vec3("rigid body position")?;
    let orientation = Quaternion::new(
        r.f32("rigid body orientation")?,
        r.f32("rigid body orientation")?,
        r.f32("rigid body orientation")?,
        r.f32("rigid body orientation")?,
    );

    let markers = if fields.has(GatedField::RigidBodyMarkers) {
        read_rigid_body_markers(r, fields.has(GatedField::RigidBodyMarkerDetails))?
    } else {
        Vec::new()
    };

    let mean_error = gated(fields.has(GatedField::MeanMarkerError), || r.f32("mean marker error"))?;
    let tracking_valid = gated(fields.has(GatedField::TrackingValid), || {
        Ok(r.u16("rigid body params")? & 0x01 != 0)
    })?;

    Ok(RigidBodySample { id, position, orientation, markers, mean_error, tracking_valid })
}

fn read_rigid_body_markers(
    r: &mut PayloadReader<'_>,
    details: bool,
) -> Result<Vec<RigidBodyMarker>> {
    let per_marker = if details { VEC3_SIZE + 8 } else { VEC3_SIZE };
    let count = r.count("rigid body marker count", per_marker)?;
    let positions = (0..count)
        .map(|_| r.vec3("rigid body marker position"))
        .collect::<Result<Vec<_>>>()?;

    if !details {
        return Ok(positions
            .into_iter()
            .map(|position| RigidBodyMarker { position, id: None, size: None })
            .collect());
    }

    let ids = (0..count).map(|_| r.i32("rigid body marker id")).collect::<Result<Vec<_>>>()?;
    let sizes = (0..count).map(|_| r.f32("rigid body marker size")).collect::<Result<Vec<_>>>()?;
    Ok(positions
        .into_iter()
        .zip(ids)
        .zip(sizes)
        .map(|((position, id), size)| RigidBodyMarker { position, id: Some(id), size: Some(size) })
        .collect())
}

fn read_labeled_markers(
    r: &mut PayloadReader<'_>,
    fields: FieldSet,
) -> Result<Vec<LabeledMarkerSample>> {
    let has_params = fields.has(GatedField::LabeledMarkerParams);
    let extended = fields.has(GatedField::LabeledMarkerExtendedParams);
    let has_residual = fields.has(GatedField::LabeledMarkerResidual);

    let element_size = 4
        + VEC3_SIZE
        + 4
        + if has_params { 2 } else { 0 }
        + if has_residual { 4 } else { 0 };
    let count = r.count("labeled marker count", element_size)?;

    (0..count)
        .map(|_| -> Result<LabeledMarkerSample> {
            let id = MarkerId::from_raw(r.u32("labeled marker id")?);
            let position = r.vec3("labeled marker position")?;
            let size = r.f32("labeled marker size")?;
            let params = gated(has_params, || {
                Ok(MarkerParams::from_bits(r.u16("labeled marker params")?, extended))
            })?;
            let residual = gated(has_residual, || r.f32("labeled marker residual"))?;
            Ok(LabeledMarkerSample { id, position, size, params, residual })
        })
        .collect()
}

fn read_analog_devices(
    r: &mut PayloadReader<'_>,
    context: &'static str,
) -> Result<Vec<AnalogDeviceSample>> {
    let count = r.count(context, MIN_ANALOG_DEVICE_SIZE)?;
    (0..count)
        .map(|_| -> Result<AnalogDeviceSample> {
            let id = r.i32("analog device id")?;
            let channel_count = r.count("analog channel count", MIN_ANALOG_CHANNEL_SIZE)?;
            let channels = (0..channel_count)
                .map(|_| -> Result<Vec<f32>> {
                    let samples = r.count("analog sample count", 4)?;
                    (0..samples).map(|_| r.f32("analog sample")).collect()
                })
                .collect::<Result<Vec<Vec<f32>>>>()?;
            Ok(AnalogDeviceSample { id, channels })
        })
        .collect()
}

/// Encode `frame` as it would be streamed at `version`.
///
/// Fields the version does not carry are skipped; fields it carries but the
/// frame leaves unset are written as zero (tracking valid as `true`).
pub fn encode_frame(frame: &FrameOfData, version: ProtocolVersion) -> Vec<u8> {
    let fields = FieldSet::for_version(version);
    let mut w = PayloadWriter::with_capacity(256);

    w.i32(frame.frame_number);

    w.count(frame.marker_sets.len());
    for set in &frame.marker_sets {
        w.cstring(&set.name);
        write_points(&mut w, &set.markers);
    }

    write_points(&mut w, &frame.unlabeled_markers);
    write_rigid_bodies(&mut w, &frame.rigid_bodies, fields);

    if fields.has(GatedField::Skeletons) {
        w.count(frame.skeletons.len());
        for skeleton in &frame.skeletons {
            w.i32(skeleton.id);
            write_rigid_bodies(&mut w, &skeleton.rigid_bodies, fields);
        }
    }

    if fields.has(GatedField::LabeledMarkers) {
        w.count(frame.labeled_markers.len());
        for marker in &frame.labeled_markers {
            w.u32(marker.id.to_raw()).vec3(marker.position).f32(marker.size);
            if fields.has(GatedField::LabeledMarkerParams) {
                w.u16(marker.params.map(|p| p.bits()).unwrap_or(0));
            }
            if fields.has(GatedField::LabeledMarkerResidual) {
                w.f32(marker.residual.unwrap_or(0.0));
            }
        }
    }

    if fields.has(GatedField::ForcePlates) {
        write_analog_devices(&mut w, &frame.force_plates);
    }
    if fields.has(GatedField::Devices) {
        write_analog_devices(&mut w, &frame.devices);
    }

    if fields.has(GatedField::SoftwareLatency) {
        w.f32(frame.software_latency.unwrap_or(0.0));
    }

    w.u32(frame.timecode.raw()).u32(frame.timecode.subframe);

    if fields.has(GatedField::DoubleTimestamp) {
        w.f64(frame.timestamp);
    } else {
        w.f32(frame.timestamp as f32);
    }

    if fields.has(GatedField::HighResTimestamps) {
        let stamps = frame.high_res_timestamps.unwrap_or_default();
        w.u64(stamps.mid_exposure).u64(stamps.data_received).u64(stamps.transmit);
    }

    w.u16(frame.flags.bits()).i32(END_OF_DATA_TAG);
    w.into_bytes()
}

fn write_points(w: &mut PayloadWriter, points: &[Vec3]) {
    w.count(points.len());
    for point in points {
        w.vec3(*point);
    }
}

fn write_rigid_bodies(w: &mut PayloadWriter, bodies: &[RigidBodySample], fields: FieldSet) {
    w.count(bodies.len());
    for body in bodies {
        let q = body.orientation;
        w.i32(body.id).vec3(body.position).f32(q.x).f32(q.y).f32(q.z).f32(q.w);

        if fields.has(GatedField::RigidBodyMarkers) {
            w.count(body.markers.len());
            for marker in &body.markers {
                w.vec3(marker.position);
            }
            if fields.has(GatedField::RigidBodyMarkerDetails) {
                for marker in &body.markers {
                    w.i32(marker.id.unwrap_or(0));
                }
                for marker in &body.markers {
                    w.f32(marker.size.unwrap_or(0.0));
                }
            }
        }
        if fields.has(GatedField::MeanMarkerError) {
            w.f32(body.mean_error.unwrap_or(0.0));
        }
        if fields.has(GatedField::TrackingValid) {
            w.u16(u16::from(body.tracking_valid.unwrap_or(true)));
        }
    }
}

fn write_analog_devices(w: &mut PayloadWriter, devices: &[AnalogDeviceSample]) {
    w.count(devices.len());
    for device in devices {
        w.i32(device.id).count(device.channels.len());
        for channel in &device.channels {
            w.count(channel.len());
            for sample in channel {
                w.f32(*sample);
            }
        }
    }
}
