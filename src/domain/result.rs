//! Result type alias for pipeline operations

use super::errors::PipelineError;

/// Result type alias for pipeline operations
///
/// # Examples
///
/// ```
/// use phi_archive::domain::result::Result;
/// use phi_archive::domain::errors::PipelineError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PipelineError::Storage("table offline".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(PipelineError::Storage("test error".to_string()));
        assert!(result.is_err());
    }
}
