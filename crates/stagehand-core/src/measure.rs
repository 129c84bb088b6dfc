//! Site-map geometry and compliance checks.
//!
//! All functions are closed-form and pure. Coordinates are planar; the unit of
//! a point set is carried alongside it, never inside a [`Point`].

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Primitives ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

/// A linear unit of length.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Unit {
  Millimeters,
  Centimeters,
  #[default]
  Meters,
  Kilometers,
  Inches,
  Feet,
  Yards,
  Miles,
}

impl Unit {
  /// How many meters one of this unit spans.
  pub fn meters_per_unit(self) -> f64 {
    match self {
      Self::Millimeters => 0.001,
      Self::Centimeters => 0.01,
      Self::Meters => 1.0,
      Self::Kilometers => 1000.0,
      Self::Inches => 0.0254,
      Self::Feet => 0.3048,
      Self::Yards => 0.9144,
      Self::Miles => 1609.344,
    }
  }
}

/// What a measurement quantifies. Determines the formula and the dimension of
/// the resulting value.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MeasurementKind {
  /// Length of an open path through the points.
  Distance,
  /// Enclosed area of the polygon; squared units.
  Area,
  /// Length of the closed polygon boundary.
  Perimeter,
  /// Interior angle at the middle of three points, in degrees.
  Angle,
  /// Number of points (e.g. exits, toilets, first-aid posts).
  Count,
}

impl MeasurementKind {
  /// Minimum number of points required, and whether that number is exact.
  pub fn point_requirement(self) -> (usize, bool) {
    match self {
      Self::Distance => (2, false),
      Self::Area | Self::Perimeter => (3, false),
      Self::Angle => (3, true),
      Self::Count => (1, false),
    }
  }
}

// ─── Geometry ────────────────────────────────────────────────────────────────

pub fn distance(a: Point, b: Point) -> f64 { (b.x - a.x).hypot(b.y - a.y) }

/// Total length of the open path `points[0] → points[1] → … → points[n-1]`.
pub fn polyline_length(points: &[Point]) -> f64 {
  points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Polygon area by the shoelace formula. Winding order does not matter.
pub fn area(points: &[Point]) -> f64 {
  if points.len() < 3 {
    return 0.0;
  }
  let twice: f64 = points
    .iter()
    .zip(points.iter().cycle().skip(1))
    .map(|(p, q)| p.x * q.y - q.x * p.y)
    .sum();
  twice.abs() / 2.0
}

/// Length of the closed boundary, including the edge back to the first point.
pub fn perimeter(points: &[Point]) -> f64 {
  match points {
    [] | [_] => 0.0,
    [first, .., last] => polyline_length(points) + distance(*last, *first),
  }
}

/// The angle at `vertex` between the arms to `a` and `b`, in degrees.
///
/// Uses the law of cosines. Returns `None` when either arm has zero length.
pub fn angle(a: Point, vertex: Point, b: Point) -> Option<f64> {
  let arm_a = distance(vertex, a);
  let arm_b = distance(vertex, b);
  if arm_a == 0.0 || arm_b == 0.0 {
    return None;
  }
  let opposite = distance(a, b);
  let cos = (arm_a.powi(2) + arm_b.powi(2) - opposite.powi(2)) / (2.0 * arm_a * arm_b);
  Some(cos.clamp(-1.0, 1.0).acos().to_degrees())
}

// ─── Units ───────────────────────────────────────────────────────────────────

pub fn convert(value: f64, from: Unit, to: Unit) -> f64 {
  if from == to {
    return value;
  }
  value * from.meters_per_unit() / to.meters_per_unit()
}

/// Convert a squared quantity, e.g. square meters to square feet.
pub fn convert_area(value: f64, from: Unit, to: Unit) -> f64 {
  if from == to {
    return value;
  }
  let ratio = from.meters_per_unit() / to.meters_per_unit();
  value * ratio * ratio
}

/// Convert a value of the given kind between units. Angles and counts are
/// unitless and pass through unchanged.
pub fn convert_for(kind: MeasurementKind, value: f64, from: Unit, to: Unit) -> f64 {
  match kind {
    MeasurementKind::Distance | MeasurementKind::Perimeter => convert(value, from, to),
    MeasurementKind::Area => convert_area(value, from, to),
    MeasurementKind::Angle | MeasurementKind::Count => value,
  }
}

/// Compute the value of a measurement over `points`.
///
/// Callers are expected to have checked the point count against
/// [`MeasurementKind::point_requirement`]; a degenerate angle yields `0.0`.
pub fn measure(kind: MeasurementKind, points: &[Point]) -> f64 {
  match kind {
    MeasurementKind::Distance => polyline_length(points),
    MeasurementKind::Area => area(points),
    MeasurementKind::Perimeter => perimeter(points),
    MeasurementKind::Angle => match points {
      [a, vertex, b] => angle(*a, *vertex, *b).unwrap_or(0.0),
      _ => 0.0,
    },
    MeasurementKind::Count => points.len() as f64,
  }
}

// ─── Compliance ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
  Info,
  Warning,
  Critical,
}

/// A threshold that measurements of one kind must respect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRule {
  pub rule_id:   Uuid,
  pub name:      String,
  pub kind:      MeasurementKind,
  pub min_value: Option<f64>,
  pub max_value: Option<f64>,
  /// Unit the thresholds are expressed in.
  pub unit:      Unit,
  pub severity:  Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
  Compliant,
  Warning,
  Violation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceResult {
  pub rule_id:  Uuid,
  pub status:   ComplianceStatus,
  /// The measured value, converted into the rule's unit.
  pub measured: f64,
  pub message:  String,
}

/// Evaluate a single rule against a measured value.
pub fn check_rule(rule: &ComplianceRule, value: f64, unit: Unit) -> ComplianceResult {
  let measured = convert_for(rule.kind, value, unit, rule.unit);

  let failure = match (rule.min_value, rule.max_value) {
    (Some(min), _) if measured < min => Some(format!("below minimum {min}")),
    (_, Some(max)) if measured > max => Some(format!("above maximum {max}")),
    _ => None,
  };

  let (status, message) = match failure {
    None => (ComplianceStatus::Compliant, format!("{}: ok", rule.name)),
    Some(reason) => {
      let status = if rule.severity == Severity::Critical {
        ComplianceStatus::Violation
      } else {
        ComplianceStatus::Warning
      };
      (status, format!("{}: {measured:.2} is {reason}", rule.name))
    }
  };

  ComplianceResult { rule_id: rule.rule_id, status, measured, message }
}

/// Evaluate every rule in `rules` whose kind matches `kind`.
pub fn check_compliance(
  kind: MeasurementKind,
  value: f64,
  unit: Unit,
  rules: &[ComplianceRule],
) -> Vec<ComplianceResult> {
  rules
    .iter()
    .filter(|rule| rule.kind == kind)
    .map(|rule| check_rule(rule, value, unit))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const EPS: f64 = 1e-9;

  fn unit_square() -> Vec<Point> {
    vec![
      Point::new(0.0, 0.0),
      Point::new(1.0, 0.0),
      Point::new(1.0, 1.0),
      Point::new(0.0, 1.0),
    ]
  }

  fn rule(min: Option<f64>, max: Option<f64>, severity: Severity) -> ComplianceRule {
    ComplianceRule {
      rule_id: Uuid::nil(),
      name: "aisle width".into(),
      kind: MeasurementKind::Distance,
      min_value: min,
      max_value: max,
      unit: Unit::Meters,
      severity,
    }
  }

  #[test]
  fn distance_is_symmetric() {
    let p = Point::new(-3.5, 2.0);
    let q = Point::new(4.25, -7.0);
    assert_eq!(distance(p, q), distance(q, p));
    assert!((distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)) - 5.0).abs() < EPS);
  }

  #[test]
  fn unit_square_area_and_perimeter() {
    assert!((area(&unit_square()) - 1.0).abs() < EPS);
    assert!((perimeter(&unit_square()) - 4.0).abs() < EPS);
  }

  #[test]
  fn area_ignores_winding_order() {
    let mut clockwise = unit_square();
    clockwise.reverse();
    assert!((area(&clockwise) - 1.0).abs() < EPS);
  }

  #[test]
  fn degenerate_shapes() {
    assert_eq!(area(&unit_square()[..2]), 0.0);
    assert_eq!(perimeter(&[]), 0.0);
    assert_eq!(perimeter(&[Point::new(1.0, 1.0)]), 0.0);
    assert_eq!(angle(Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(1.0, 0.0)), None);
  }

  #[test]
  fn right_and_straight_angles() {
    let right = angle(Point::new(1.0, 0.0), Point::new(0.0, 0.0), Point::new(0.0, 1.0)).unwrap();
    assert!((right - 90.0).abs() < EPS);
    let straight =
      angle(Point::new(-1.0, 0.0), Point::new(0.0, 0.0), Point::new(2.0, 0.0)).unwrap();
    assert!((straight - 180.0).abs() < 1e-6);
  }

  #[test]
  fn meters_to_feet() {
    assert!((convert(1.0, Unit::Meters, Unit::Feet) - 3.28084).abs() < 1e-5);
    for x in [0.0, 1.0, 12.5, 1234.567] {
      let back = convert(convert(x, Unit::Meters, Unit::Feet), Unit::Feet, Unit::Meters);
      assert!((back - x).abs() < 1e-9, "{x} round-tripped to {back}");
    }
  }

  #[test]
  fn square_meter_to_square_feet() {
    assert!((convert_area(1.0, Unit::Meters, Unit::Feet) - 10.7639).abs() < 1e-4);
  }

  #[test]
  fn measure_dispatches_by_kind() {
    let sq = unit_square();
    assert!((measure(MeasurementKind::Distance, &sq) - 3.0).abs() < EPS);
    assert!((measure(MeasurementKind::Perimeter, &sq) - 4.0).abs() < EPS);
    assert!((measure(MeasurementKind::Area, &sq) - 1.0).abs() < EPS);
    assert!((measure(MeasurementKind::Angle, &sq[..3]) - 90.0).abs() < EPS);
    assert_eq!(measure(MeasurementKind::Count, &sq), 4.0);
  }

  #[test]
  fn below_minimum_is_warning_unless_critical() {
    let warn = check_rule(&rule(Some(2.0), None, Severity::Warning), 1.5, Unit::Meters);
    assert_eq!(warn.status, ComplianceStatus::Warning);

    let crit = check_rule(&rule(Some(2.0), None, Severity::Critical), 1.5, Unit::Meters);
    assert_eq!(crit.status, ComplianceStatus::Violation);

    let ok = check_rule(&rule(Some(2.0), Some(5.0), Severity::Critical), 3.0, Unit::Meters);
    assert_eq!(ok.status, ComplianceStatus::Compliant);
  }

  #[test]
  fn rule_thresholds_apply_in_rule_unit() {
    // 5 ft is about 1.52 m, under a 2 m minimum.
    let result = check_rule(&rule(Some(2.0), None, Severity::Info), 5.0, Unit::Feet);
    assert_eq!(result.status, ComplianceStatus::Warning);
    assert!((result.measured - 1.524).abs() < 1e-9);
  }

  #[test]
  fn compliance_only_applies_matching_kinds() {
    let mut area_rule = rule(Some(100.0), None, Severity::Critical);
    area_rule.kind = MeasurementKind::Area;
    let rules = vec![rule(None, Some(10.0), Severity::Warning), area_rule];

    let results = check_compliance(MeasurementKind::Distance, 12.0, Unit::Meters, &rules);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ComplianceStatus::Warning);
  }
}
