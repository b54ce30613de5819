// SPDX-License-Identifier: Apache-2.0

mod boundary;

pub use boundary::{Fetcher, TemplateEngine, TextDiff};
