use argminmax::ArgMinMax;

pub fn get_max(vec: &[f64]) -> f64 {
    let max_index: usize = vec.argmax();
    vec[max_index]
}

pub fn get_min(vec: &[f64]) -> f64 {
    let min_index: usize = vec.argmin();
    vec[min_index]
}

/// Index of the largest value. Ties resolve to the first occurrence.
pub fn argmax_index(vec: &[f64]) -> usize {
    vec.argmax()
}

/// Index of the smallest value. Ties resolve to the first occurrence.
pub fn argmin_index(vec: &[f64]) -> usize {
    vec.argmin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max() {
        let values = [1.5, -2.0, 7.25, 0.0];
        assert_eq!(get_max(&values), 7.25);
        assert_eq!(get_min(&values), -2.0);
        assert_eq!(argmax_index(&values), 2);
        assert_eq!(argmin_index(&values), 1);
    }
}
