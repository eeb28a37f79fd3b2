//! Model definition (data description) types

use serde::{Deserialize, Serialize};

use super::Vec3;

/// One entry of a model definition packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Descriptor {
    MarkerSet(MarkerSetDescriptor),
    RigidBody(RigidBodyDescriptor),
    Skeleton(SkeletonDescriptor),
}

impl Descriptor {
    /// Dataset type tag used on the wire.
    pub const fn type_tag(&self) -> i32 {
        match self {
            Descriptor::MarkerSet(_) => 0,
            Descriptor::RigidBody(_) => 1,
            Descriptor::Skeleton(_) => 2,
        }
    }

    /// Asset name, if the descriptor carries one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Descriptor::MarkerSet(set) => Some(&set.name),
            Descriptor::RigidBody(body) => body.name.as_deref(),
            Descriptor::Skeleton(skeleton) => Some(&skeleton.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerSetDescriptor {
    pub name: String,
    pub marker_names: Vec<String>,
}

/// Rigid body definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyDescriptor {
    /// Sent from 2.0 on
    pub name: Option<String>,
    pub id: i32,
    pub parent_id: i32,
    pub offset: Vec3,
    /// Expected marker layout, sent from 3.0 on
    pub markers: Vec<RigidBodyMarkerDescriptor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyMarkerDescriptor {
    pub position: Vec3,
    /// Active label the marker must carry; 0 when unconstrained
    pub required_label: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDescriptor {
    pub name: String,
    pub id: i32,
    pub bones: Vec<BoneDescriptor>,
}

/// Rigid body inside a skeleton definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneDescriptor {
    /// Sent from 2.0 on
    pub name: Option<String>,
    pub id: i32,
    pub parent_id: i32,
    pub offset: Vec3,
}
