// SPDX-License-Identifier: Apache-2.0

pub mod hash;
pub mod path;
pub mod value;
