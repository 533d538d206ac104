use crate::error::{EqError, EqResult};

/// Per-block detection quality
#[derive(Debug, Clone)]
pub struct ErrorRates {
    /// Fraction of mismatched symbols
    pub ser: f32,
    /// 1.0 if the block had any mismatch, else 0.0
    pub fer: f32,
    /// Positions of the mismatched symbols
    pub error_indices: Vec<usize>,
}

/// Compare detected symbols against the ground truth of one block.
pub fn calculate_error_rates(detected: &[u8], transmitted: &[u8]) -> EqResult<ErrorRates> {
    if detected.len() != transmitted.len() {
        return Err(EqError::InvalidInput(format!(
            "detected word length {} does not match transmitted length {}",
            detected.len(),
            transmitted.len()
        )));
    }
    if detected.is_empty() {
        return Err(EqError::InvalidInput("cannot score an empty block".into()));
    }

    let error_indices: Vec<usize> = detected
        .iter()
        .zip(transmitted.iter())
        .enumerate()
        .filter(|(_, (d, t))| d != t)
        .map(|(i, _)| i)
        .collect();

    let ser = error_indices.len() as f32 / detected.len() as f32;
    let fer = if error_indices.is_empty() { 0.0 } else { 1.0 };
    Ok(ErrorRates {
        ser,
        fer,
        error_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_block() {
        let rates = calculate_error_rates(&[0, 1, 1, 0], &[0, 1, 1, 0]).unwrap();
        assert_eq!(rates.ser, 0.0);
        assert_eq!(rates.fer, 0.0);
        assert!(rates.error_indices.is_empty());
    }

    #[test]
    fn test_partial_errors() {
        let rates = calculate_error_rates(&[0, 0, 1, 0], &[0, 1, 1, 1]).unwrap();
        assert!((rates.ser - 0.5).abs() < 1e-6);
        assert_eq!(rates.fer, 1.0);
        assert_eq!(rates.error_indices, vec![1, 3]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(calculate_error_rates(&[0, 1], &[0, 1, 1]).is_err());
    }
}
