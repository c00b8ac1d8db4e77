//! Grade point and weighted GPA computation.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::error::AuditError;
use super::types::{Course, Gpa, Grading};

const MAX_GRADE_POINT: Decimal = dec!(4);
const CURVE_FACTOR: Decimal = dec!(3);
const CURVE_DIVISOR: Decimal = dec!(1600);

/// Decimal places a GPA is reported with
pub const GPA_DECIMAL_PLACES: u32 = 3;

/// Grade point of a percentage grade: `4 - 3 * (100 - grade)^2 / 1600`.
///
/// Not clamped. A grade of 0 yields -14.75.
pub fn grade_point(grade: Decimal) -> Decimal {
    let gap = Decimal::ONE_HUNDRED - grade;
    MAX_GRADE_POINT - CURVE_FACTOR * gap * gap / CURVE_DIVISOR
}

pub fn round_gpa(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(GPA_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Credit-weighted GPA over the percentage-graded courses.
///
/// Pass/fail courses contribute to neither the numerator nor the
/// denominator. With no percentage-graded courses the GPA is 0.
///
/// # Errors
/// * `CreditOverflow` - the weighted sum leaves the decimal range
pub fn compute_gpa(courses: &[Course]) -> Result<Gpa, AuditError> {
    let overflow = || AuditError::CreditOverflow {
        scope: "the GPA".to_string(),
    };
    let mut weighted = Decimal::ZERO;
    let mut credits = Decimal::ZERO;

    for course in courses {
        if let Grading::Percentage { grade } = course.grading {
            let points = grade_point(grade)
                .checked_mul(course.credits)
                .ok_or_else(overflow)?;
            weighted = weighted.checked_add(points).ok_or_else(overflow)?;
            credits = credits.checked_add(course.credits).ok_or_else(overflow)?;
        }
    }

    if credits.is_zero() {
        return Ok(Gpa::default());
    }

    Ok(Gpa {
        raw: weighted / credits,
        credits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_point_boundaries() {
        assert_eq!(round_gpa(grade_point(dec!(100))), dec!(4.000));
        assert_eq!(round_gpa(grade_point(dec!(0))), dec!(-14.750));
        assert_eq!(grade_point(dec!(60)), dec!(1));
    }

    #[test]
    fn test_weighted_gpa() {
        let courses = vec![
            Course::percentage("c1", "Calculus", dec!(3), dec!(90), "math"),
            Course::percentage("c2", "Physics", dec!(1), dec!(60), "sci"),
        ];

        let gpa = compute_gpa(&courses).unwrap();
        assert_eq!(gpa.raw, dec!(3.109375));
        assert_eq!(gpa.rounded(), dec!(3.109));
        assert_eq!(gpa.credits, dec!(4));
    }

    #[test]
    fn test_pass_fail_excluded() {
        let courses = vec![
            Course::percentage("c1", "Calculus", dec!(2), dec!(100), "math"),
            Course::pass_fail("c2", "Sports", dec!(4), true, "pe"),
        ];

        let gpa = compute_gpa(&courses).unwrap();
        assert_eq!(gpa.rounded(), dec!(4));
        assert_eq!(gpa.credits, dec!(2));
    }

    #[test]
    fn test_no_eligible_courses_is_zero() {
        assert_eq!(compute_gpa(&[]).unwrap().rounded(), Decimal::ZERO);

        let only_pass_fail = vec![Course::pass_fail("c1", "Lab", dec!(1), false, "lab")];
        let gpa = compute_gpa(&only_pass_fail).unwrap();
        assert_eq!(gpa.raw, Decimal::ZERO);
        assert_eq!(gpa.credits, Decimal::ZERO);
    }

    #[test]
    fn test_weighted_sum_overflow_is_an_error() {
        let courses = vec![
            Course::percentage("c1", "Huge", dec!(50000000000000000000000000000), dec!(100), "math"),
            Course::percentage("c2", "Huger", dec!(50000000000000000000000000000), dec!(100), "math"),
        ];

        let err = compute_gpa(&courses).unwrap_err();
        assert_eq!(err.kind(), "credit_overflow");
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(round_gpa(dec!(3.1095)), dec!(3.110));
        assert_eq!(round_gpa(dec!(3.1094999)), dec!(3.109));
    }
}
