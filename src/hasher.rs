//! Streaming MD5 digests of file contents.

use crate::error::HashError;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Computes the lowercase hex MD5 digest of a file, reading it in fixed-size
/// chunks so memory use does not grow with the file.
pub async fn hash_file(path: &Path) -> Result<String, HashError> {
    let mut file = File::open(path)
        .await
        .map_err(|e| HashError::new(path, e))?;

    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| HashError::new(path, e))?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }

    Ok(format!("{:x}", context.compute()))
}
