//! Body-mass index from height and weight.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Bands apply to the value already rounded to one decimal, so 24.94
    /// (shown as 24.9) is still Normal.
    pub fn classify(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BmiReading {
    pub bmi: f64,
    pub category: BmiCategory,
}

/// `weight / (height_m)^2`, rounded to one decimal.
pub fn calculate(height_cm: f64, weight_kg: f64) -> Result<BmiReading, AppError> {
    if !height_cm.is_finite() || height_cm <= 0.0 {
        return Err(AppError::Validation(
            "Height must be a positive number".to_string(),
        ));
    }
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(AppError::Validation(
            "Weight must be a positive number".to_string(),
        ));
    }

    let height_m = height_cm / 100.0;
    let bmi = round_one_decimal(weight_kg / (height_m * height_m));

    Ok(BmiReading {
        bmi,
        category: BmiCategory::classify(bmi),
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
