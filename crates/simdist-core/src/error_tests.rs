//! Tests for error display and status mapping.

use super::error::{Error, Result, Status};
use super::types::{DataType, Metric};

#[test]
fn test_error_display() {
    let err = Error::Unsupported {
        metric: Metric::Hamming,
        dtype: DataType::F32,
    };
    assert_eq!(
        err.to_string(),
        "Unsupported metric/dtype combination: hamming over float32"
    );

    let err = Error::LengthMismatch { a: 3, b: 4, n: 3 };
    assert_eq!(
        err.to_string(),
        "Length mismatch: a has 3 elements, b has 4, declared 3"
    );
}

#[test]
fn test_error_status_mapping() {
    let unsupported = Error::Unsupported {
        metric: Metric::KlDivergence,
        dtype: DataType::I8,
    };
    assert_eq!(unsupported.status(), Status::UnsupportedMetricOrDtype);
    assert_eq!(
        Error::LengthMismatch { a: 1, b: 2, n: 1 }.status(),
        Status::LengthMismatch
    );
    assert_eq!(
        Error::InvalidArgument("null".into()).status(),
        Status::InvalidArgument
    );
    assert_eq!(
        Error::Config("bad tier".into()).status(),
        Status::InvalidArgument
    );
}

#[test]
fn test_status_codes_are_stable() {
    assert_eq!(Status::Ok as i32, 0);
    assert_eq!(Status::UnsupportedMetricOrDtype as i32, 1);
    assert_eq!(Status::LengthMismatch as i32, 2);
    assert_eq!(Status::InvalidArgument as i32, 3);
}

#[test]
fn test_status_from_result() {
    let ok: Result<f64> = Ok(1.0);
    assert_eq!(Status::from(&ok), Status::Ok);

    let err: Result<f64> = Err(Error::LengthMismatch { a: 0, b: 1, n: 0 });
    assert_eq!(Status::from(&err), Status::LengthMismatch);
}
