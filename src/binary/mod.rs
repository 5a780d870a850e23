// Copyright Amazon.com, Inc. or its affiliates.

//! This module provides the necessary structures and logic to read tokens from a binary Ion
//! data stream.

use std::fmt::{Display, Formatter};

use crate::binary::type_descriptor::{
    TypeDescriptor, ION_1_0_TYPE_DESCRIPTORS, ION_1_1_TYPE_DESCRIPTORS,
};
use crate::result::{decoding_error, IonResult};

pub mod constants;
pub(crate) mod decode_mode;
pub mod flex_int;
pub mod flex_sym;
pub mod flex_uint;
pub mod non_blocking;
pub mod type_descriptor;
pub mod var_uint;

/// The versions of the binary Ion encoding that the cursor can read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IonVersion {
    V1_0,
    V1_1,
}

impl IonVersion {
    /// Resolves the version declared by an Ion version marker.
    pub fn from_marker(major: u8, minor: u8) -> IonResult<IonVersion> {
        match (major, minor) {
            (1, 0) => Ok(IonVersion::V1_0),
            (1, 1) => Ok(IonVersion::V1_1),
            _ => decoding_error(format!("Unsupported Ion version: {major}.{minor}")),
        }
    }

    pub fn major(&self) -> u8 {
        1
    }

    pub fn minor(&self) -> u8 {
        match self {
            IonVersion::V1_0 => 0,
            IonVersion::V1_1 => 1,
        }
    }

    pub fn type_descriptors(&self) -> &'static [TypeDescriptor; 256] {
        match self {
            IonVersion::V1_0 => &ION_1_0_TYPE_DESCRIPTORS,
            IonVersion::V1_1 => &ION_1_1_TYPE_DESCRIPTORS,
        }
    }
}

impl Display for IonVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ion {}.{}", self.major(), self.minor())
    }
}
