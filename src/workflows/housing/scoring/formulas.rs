use super::super::domain::{CriterionKind, Student};

/// Raw points one criterion kind grants a student, before the criterion
/// weight is applied.
pub(crate) fn points_for(kind: CriterionKind, student: &Student) -> f64 {
    match kind {
        CriterionKind::AcademicPerformance => academic_points(student),
        CriterionKind::StudyYear => study_year_points(student),
        CriterionKind::Socioeconomic => socioeconomic_points(student),
        CriterionKind::HealthDisadvantage => health_points(student),
        CriterionKind::Unrecognized => 0.0,
    }
}

/// Lower grade averages earn more points. The scale bottoms out at zero for a
/// 4.0 average and saturates at 100 for a 0.0 average. Students without a
/// recorded average get nothing rather than a guessed value.
fn academic_points(student: &Student) -> f64 {
    match student.grade_average {
        Some(average) => ((4.0 - average) * 25.0).max(0.0),
        None => 0.0,
    }
}

fn study_year_points(student: &Student) -> f64 {
    match student.year_of_study {
        1 => 20.0,
        2 => 40.0,
        3 => 60.0,
        4 => 80.0,
        5 => 100.0,
        _ => 0.0,
    }
}

/// Commute distance and per-capita household income award points
/// independently and add up. Band edges are exclusive for distance and
/// inclusive for income. A household size of zero means the income situation
/// is unknown, so that half is skipped.
fn socioeconomic_points(student: &Student) -> f64 {
    let mut points = 0.0;

    if let Some(distance) = student.distance_km {
        if distance > 100.0 {
            points += 40.0;
        } else if distance > 50.0 {
            points += 25.0;
        } else if distance > 20.0 {
            points += 10.0;
        }
    }

    if student.household_size > 0 {
        if let Some(income) = student.household_income {
            let per_capita = income / f64::from(student.household_size);
            if per_capita <= 250.0 {
                points += 50.0;
            } else if per_capita <= 400.0 {
                points += 35.0;
            } else if per_capita <= 600.0 {
                points += 15.0;
            }
        }
    }

    points
}

fn health_points(student: &Student) -> f64 {
    if student.disability {
        100.0
    } else {
        0.0
    }
}
