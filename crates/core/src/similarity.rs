use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::IndexShape;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    /// `None` when either vector has zero length.
    pub cosine: Option<f64>,
    pub euclidean: f64,
}

impl Similarity {
    pub fn between(a: &[f32], b: &[f32]) -> Self {
        Self {
            cosine: cosine_similarity(a, b),
            euclidean: euclidean_distance(a, b),
        }
    }
}

/// Outcome of comparing two keys. A missing key is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Similar(Similarity),
    NotFound(String),
}

/// Anything that can resolve keys to vectors and compare them.
pub trait WordVectors {
    fn shape(&self) -> IndexShape;

    fn compare(&mut self, first: &str, second: &str) -> Result<Comparison>;
}

pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

pub fn euclidean_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt()
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (*x as f64 - *y as f64).powi(2))
        .sum::<f64>()
        .sqrt()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    let norms = euclidean_norm(a) * euclidean_norm(b);
    if norms == 0.0 {
        return None;
    }
    Some(dot(a, b) / norms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cat_and_dog() {
        let sim = Similarity::between(&[1.0, 2.0], &[3.0, 4.0]);
        let expected = 11.0 / (5.0 * 5f64.sqrt());
        assert!((sim.cosine.unwrap() - expected).abs() < 1e-12);
        assert!((sim.euclidean - 8f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn zero_vector_has_no_cosine() {
        let sim = Similarity::between(&[1.0, 2.0], &[0.0, 0.0]);
        assert_eq!(sim.cosine, None);
        assert!((sim.euclidean - 5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn norm_of_three_four() {
        assert_eq!(euclidean_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
    }

    #[test]
    fn identical_vectors() {
        let v = [0.25, -0.5, 2.0];
        let sim = Similarity::between(&v, &v);
        assert!((sim.cosine.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(sim.euclidean, 0.0);
    }
}
