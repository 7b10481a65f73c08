use sinew_core::IntegrationError;

/// Resizes a scratch buffer, reporting allocation failure instead of aborting.
pub(crate) fn resize<T: Clone + Default>(
    buffer: &mut Vec<T>,
    len: usize,
) -> Result<(), IntegrationError> {
    if len > buffer.len() {
        buffer
            .try_reserve_exact(len - buffer.len())
            .map_err(|_| IntegrationError::Allocation { len })?;
    }
    buffer.resize(len, T::default());
    Ok(())
}
