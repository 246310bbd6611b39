//! Metric data points
//!
//! A [`DataPoint`] pairs one point with the metric it belongs to so encoders
//! can read the metric name, extract a document value and pick the dynamic
//! template that tells the datastore how to map the field.

use std::collections::HashMap;

use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::metrics::v1::{
    metric, number_data_point, HistogramDataPoint, Metric, NumberDataPoint, ScopeMetrics,
    SummaryDataPoint,
};

use crate::attributes;
use crate::document::{Document, Value};
use crate::error::{EncodeError, Result};

/// The typed point wrapped by a [`DataPoint`]
#[derive(Debug, Clone, Copy)]
pub enum DataPointKind<'a> {
    Number(&'a NumberDataPoint),
    Histogram(&'a HistogramDataPoint),
    Summary(&'a SummaryDataPoint),
}

/// One data point together with its metric.
#[derive(Debug, Clone, Copy)]
pub struct DataPoint<'a> {
    metric: &'a Metric,
    kind: DataPointKind<'a>,
}

impl<'a> DataPoint<'a> {
    pub fn new(metric: &'a Metric, kind: DataPointKind<'a>) -> Self {
        Self { metric, kind }
    }

    pub fn metric(&self) -> &'a Metric {
        self.metric
    }

    pub fn kind(&self) -> DataPointKind<'a> {
        self.kind
    }

    pub fn timestamp(&self) -> u64 {
        match self.kind {
            DataPointKind::Number(dp) => dp.time_unix_nano,
            DataPointKind::Histogram(dp) => dp.time_unix_nano,
            DataPointKind::Summary(dp) => dp.time_unix_nano,
        }
    }

    pub fn start_timestamp(&self) -> u64 {
        match self.kind {
            DataPointKind::Number(dp) => dp.start_time_unix_nano,
            DataPointKind::Histogram(dp) => dp.start_time_unix_nano,
            DataPointKind::Summary(dp) => dp.start_time_unix_nano,
        }
    }

    pub fn attributes(&self) -> &'a [KeyValue] {
        match self.kind {
            DataPointKind::Number(dp) => &dp.attributes,
            DataPointKind::Histogram(dp) => &dp.attributes,
            DataPointKind::Summary(dp) => &dp.attributes,
        }
    }

    /// Extract the point's value as a document value.
    ///
    /// Fails for number points without a value or with a NaN/infinite double,
    /// and for histograms whose bucket counts do not match their bounds.
    pub fn value(&self) -> Result<Value> {
        match self.kind {
            DataPointKind::Number(dp) => number_value(&self.metric.name, dp),
            DataPointKind::Histogram(dp) => histogram_value(&self.metric.name, dp),
            DataPointKind::Summary(dp) => Ok(summary_value(dp)),
        }
    }

    /// Dynamic template name for the field holding this point's value
    pub fn dynamic_template(&self) -> &'static str {
        match self.kind {
            DataPointKind::Number(dp) => {
                let monotonic = matches!(
                    self.metric.data,
                    Some(metric::Data::Sum(ref sum)) if sum.is_monotonic
                );
                match (dp.value.as_ref(), monotonic) {
                    (Some(number_data_point::Value::AsDouble(_)), true) => "counter_double",
                    (Some(number_data_point::Value::AsInt(_)), true) => "counter_long",
                    (Some(number_data_point::Value::AsDouble(_)), false) => "gauge_double",
                    (Some(number_data_point::Value::AsInt(_)), false) => "gauge_long",
                    (None, _) => "",
                }
            }
            DataPointKind::Histogram(_) => "histogram",
            DataPointKind::Summary(_) => "summary",
        }
    }

    /// Collect every data point of `metric`.
    ///
    /// Exponential histograms have no document representation here; each of
    /// their points is reported through `validation_errors` instead.
    pub fn collect(
        metric: &'a Metric,
        out: &mut Vec<DataPoint<'a>>,
        validation_errors: &mut Vec<EncodeError>,
    ) {
        match metric.data.as_ref() {
            Some(metric::Data::Gauge(gauge)) => out.extend(
                gauge
                    .data_points
                    .iter()
                    .map(|dp| DataPoint::new(metric, DataPointKind::Number(dp))),
            ),
            Some(metric::Data::Sum(sum)) => out.extend(
                sum.data_points
                    .iter()
                    .map(|dp| DataPoint::new(metric, DataPointKind::Number(dp))),
            ),
            Some(metric::Data::Histogram(histogram)) => out.extend(
                histogram
                    .data_points
                    .iter()
                    .map(|dp| DataPoint::new(metric, DataPointKind::Histogram(dp))),
            ),
            Some(metric::Data::Summary(summary)) => out.extend(
                summary
                    .data_points
                    .iter()
                    .map(|dp| DataPoint::new(metric, DataPointKind::Summary(dp))),
            ),
            Some(metric::Data::ExponentialHistogram(histogram)) => {
                validation_errors.extend(histogram.data_points.iter().map(|_| {
                    EncodeError::UnsupportedDataPoint {
                        metric: metric.name.clone(),
                        kind: "exponential histogram",
                    }
                }));
            }
            None => {}
        }
    }
}

fn number_value(metric: &str, dp: &NumberDataPoint) -> Result<Value> {
    match dp.value {
        Some(number_data_point::Value::AsInt(i)) => Ok(Value::Int(i)),
        Some(number_data_point::Value::AsDouble(d)) if d.is_finite() => Ok(Value::Double(d)),
        _ => Err(EncodeError::InvalidNumberDataPoint {
            metric: metric.to_string(),
        }),
    }
}

// Bucket midpoints: the first bucket (-inf, b0] uses b0 (halved when positive),
// the last bucket (bn, +inf) uses bn, the rest the middle of their bounds.
fn histogram_value(metric: &str, dp: &HistogramDataPoint) -> Result<Value> {
    let bounds = &dp.explicit_bounds;
    let counts = &dp.bucket_counts;
    if bounds.is_empty() || counts.len() != bounds.len() + 1 {
        return Err(EncodeError::InvalidHistogramDataPoint {
            metric: metric.to_string(),
            reason: format!(
                "{} bucket counts for {} explicit bounds",
                counts.len(),
                bounds.len()
            ),
        });
    }

    let mut count_values = Vec::with_capacity(counts.len());
    let mut bucket_values = Vec::with_capacity(counts.len());
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let value = if i == 0 {
            let upper = bounds[0];
            if upper > 0.0 {
                upper / 2.0
            } else {
                upper
            }
        } else if i == counts.len() - 1 {
            bounds[i - 1]
        } else {
            bounds[i - 1] + (bounds[i] - bounds[i - 1]) / 2.0
        };
        count_values.push(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)));
        bucket_values.push(Value::Double(value));
    }

    let mut doc = Document::new();
    doc.add("counts", Value::Array(count_values));
    doc.add("values", Value::Array(bucket_values));
    Ok(Value::Object(doc))
}

fn summary_value(dp: &SummaryDataPoint) -> Value {
    let mut doc = Document::new();
    doc.add("sum", Value::Double(dp.sum));
    doc.add(
        "value_count",
        Value::Int(i64::try_from(dp.count).unwrap_or(i64::MAX)),
    );
    Value::Object(doc)
}

/// Group the points of one scope into documents: points sharing a timestamp
/// and attribute set end up together, in first-seen order.
pub fn group_data_points<'a>(
    scope_metrics: &'a ScopeMetrics,
    validation_errors: &mut Vec<EncodeError>,
) -> Vec<Vec<DataPoint<'a>>> {
    let mut points = Vec::new();
    for metric in &scope_metrics.metrics {
        DataPoint::collect(metric, &mut points, validation_errors);
    }

    let mut groups: Vec<Vec<DataPoint<'a>>> = Vec::new();
    let mut positions: HashMap<(u64, String), usize> = HashMap::new();
    for dp in points {
        let key = (
            dp.timestamp(),
            attributes::attributes_to_json(dp.attributes()).to_string(),
        );
        match positions.get(&key) {
            Some(&pos) => groups[pos].push(dp),
            None => {
                positions.insert(key, groups.len());
                groups.push(vec![dp]);
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::metrics::v1::{
        ExponentialHistogram, ExponentialHistogramDataPoint, Gauge, Histogram, Sum,
    };

    fn gauge(name: &str, points: Vec<NumberDataPoint>) -> Metric {
        Metric {
            name: name.to_string(),
            data: Some(metric::Data::Gauge(Gauge {
                data_points: points,
            })),
            ..Default::default()
        }
    }

    fn number(time: u64, value: number_data_point::Value) -> NumberDataPoint {
        NumberDataPoint {
            time_unix_nano: time,
            value: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn number_values_and_templates() {
        let m = gauge(
            "cpu",
            vec![
                number(1, number_data_point::Value::AsDouble(0.5)),
                number(1, number_data_point::Value::AsInt(3)),
            ],
        );
        let mut points = Vec::new();
        let mut errors = Vec::new();
        DataPoint::collect(&m, &mut points, &mut errors);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value().unwrap(), Value::Double(0.5));
        assert_eq!(points[0].dynamic_template(), "gauge_double");
        assert_eq!(points[1].value().unwrap(), Value::Int(3));
        assert_eq!(points[1].dynamic_template(), "gauge_long");
    }

    #[test]
    fn monotonic_sum_uses_counter_templates() {
        let m = Metric {
            name: "requests".into(),
            data: Some(metric::Data::Sum(Sum {
                data_points: vec![number(1, number_data_point::Value::AsInt(10))],
                is_monotonic: true,
                ..Default::default()
            })),
            ..Default::default()
        };
        let mut points = Vec::new();
        DataPoint::collect(&m, &mut points, &mut Vec::new());
        assert_eq!(points[0].dynamic_template(), "counter_long");
    }

    #[test]
    fn nan_and_missing_values_are_invalid() {
        let m = gauge(
            "bad",
            vec![
                number(1, number_data_point::Value::AsDouble(f64::NAN)),
                NumberDataPoint::default(),
            ],
        );
        let mut points = Vec::new();
        DataPoint::collect(&m, &mut points, &mut Vec::new());
        for dp in points {
            assert!(matches!(
                dp.value(),
                Err(EncodeError::InvalidNumberDataPoint { .. })
            ));
        }
    }

    #[test]
    fn histogram_midpoints() {
        let m = Metric {
            name: "latency".into(),
            data: Some(metric::Data::Histogram(Histogram {
                data_points: vec![HistogramDataPoint {
                    bucket_counts: vec![1, 0, 2, 3],
                    explicit_bounds: vec![1.0, 2.0, 4.0],
                    ..Default::default()
                }],
                ..Default::default()
            })),
            ..Default::default()
        };
        let mut points = Vec::new();
        DataPoint::collect(&m, &mut points, &mut Vec::new());
        let mut doc = Document::new();
        doc.add("h", points[0].value().unwrap());
        let mut buf = Vec::new();
        doc.serialize(&mut buf, false).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["h"]["counts"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["h"]["values"], serde_json::json!([0.5, 3.0, 4.0]));
        assert_eq!(points[0].dynamic_template(), "histogram");
    }

    #[test]
    fn histogram_with_mismatched_buckets_is_invalid() {
        let dp = HistogramDataPoint {
            bucket_counts: vec![1, 2],
            explicit_bounds: vec![1.0, 2.0],
            ..Default::default()
        };
        assert!(histogram_value("h", &dp).is_err());
    }

    #[test]
    fn exponential_histograms_are_reported() {
        let m = Metric {
            name: "exp".into(),
            data: Some(metric::Data::ExponentialHistogram(ExponentialHistogram {
                data_points: vec![ExponentialHistogramDataPoint::default()],
                ..Default::default()
            })),
            ..Default::default()
        };
        let mut points = Vec::new();
        let mut errors = Vec::new();
        DataPoint::collect(&m, &mut points, &mut errors);
        assert!(points.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn groups_by_timestamp_and_attributes() {
        let scope = ScopeMetrics {
            metrics: vec![
                gauge(
                    "a",
                    vec![
                        number(1, number_data_point::Value::AsInt(1)),
                        number(2, number_data_point::Value::AsInt(2)),
                    ],
                ),
                gauge("b", vec![number(1, number_data_point::Value::AsInt(3))]),
            ],
            ..Default::default()
        };
        let groups = group_data_points(&scope, &mut Vec::new());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][1].metric().name, "b");
        assert_eq!(groups[1][0].timestamp(), 2);
    }
}
