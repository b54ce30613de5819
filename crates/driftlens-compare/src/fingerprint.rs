// SPDX-License-Identifier: Apache-2.0

use driftlens_core::{CoreError, ErrorCode, Fetcher, Sha256Stream};
use driftlens_model::Reference;

use crate::error::CompareError;

/// Digest the reference bundle for reproducibility: the serialized descriptor
/// followed by the raw bytes of every function file and template file in
/// declaration order. Any unreadable file makes the whole hash untrustworthy
/// and is fatal.
pub fn fingerprint_reference(
    fetcher: &dyn Fetcher,
    reference: &Reference,
) -> Result<String, CompareError> {
    let mut stream = Sha256Stream::new();
    let descriptor = serde_yaml::to_string(reference).map_err(|e| {
        CompareError::Core(CoreError::new(
            ErrorCode::Io,
            format!("failed to serialize reference for fingerprinting: {e}"),
        ))
    })?;
    stream.update(descriptor.as_bytes());

    let files = reference
        .template_function_files
        .iter()
        .map(String::as_str)
        .chain(reference.template_specs().map(|spec| spec.path.as_str()));
    for file in files {
        let bytes = fetcher.read(file).map_err(|e| {
            CompareError::Core(CoreError::new(
                ErrorCode::Io,
                format!("failed to read {file}, the fingerprint can not be trusted: {e}"),
            ))
        })?;
        stream.update(&bytes);
    }
    Ok(stream.finish().grouped_hex())
}
