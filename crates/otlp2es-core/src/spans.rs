//! Span field helpers shared by the span layouts

use opentelemetry_proto::tonic::trace::v1::{span::SpanKind, status::StatusCode, Status};

/// Display name of a span kind; unknown kinds yield `""`.
pub fn span_kind_name(kind: i32) -> &'static str {
    match SpanKind::try_from(kind) {
        Ok(SpanKind::Unspecified) => "Unspecified",
        Ok(SpanKind::Internal) => "Internal",
        Ok(SpanKind::Server) => "Server",
        Ok(SpanKind::Client) => "Client",
        Ok(SpanKind::Producer) => "Producer",
        Ok(SpanKind::Consumer) => "Consumer",
        Err(_) => "",
    }
}

/// Protobuf enum name of a span kind (`SPAN_KIND_SERVER`); unknown kinds yield `""`.
pub fn span_kind_proto_name(kind: i32) -> &'static str {
    SpanKind::try_from(kind).map_or("", |kind| kind.as_str_name())
}

/// Status code name; a missing status counts as unset.
pub fn status_code_name(status: Option<&Status>) -> &'static str {
    match status.map(|s| StatusCode::try_from(s.code)) {
        Some(Ok(StatusCode::Ok)) => "Ok",
        Some(Ok(StatusCode::Error)) => "Error",
        _ => "Unset",
    }
}

/// Lowercase hex of `id`, or `""` when it is empty or all zeros.
pub fn id_to_hex_or_empty(id: &[u8]) -> String {
    if id.iter().all(|b| *b == 0) {
        String::new()
    } else {
        hex::encode(id)
    }
}
