use tracing::info;

use crate::Event;

/// Renders an event as `{"data": <payload>, "type": <type>, "extensions": <json>}`.
///
/// The payload is echoed as received and the type is not quoted. If the
/// extensions cannot be encoded the field is left empty instead of failing.
pub fn render(event: &Event) -> String {
    let extensions = serde_json::to_string(event.extensions()).unwrap_or_default();
    let data = String::from_utf8_lossy(event.data().unwrap_or_default());
    format!(
        "{{\"data\": {}, \"type\": {}, \"extensions\": {}}}",
        data,
        event.ty(),
        extensions
    )
}

/// Logs one line for the event.
pub fn display(event: &Event) {
    info!("{}", render(event));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sample_event() {
        let event = Event::builder()
            .id("1")
            .source("/producer")
            .ty("sample.created")
            .data(&br#"{"id": 2}"#[..])
            .extension("priority", 1)
            .build()
            .unwrap();
        assert_eq!(
            render(&event),
            r#"{"data": {"id": 2}, "type": sample.created, "extensions": {"priority":1}}"#
        );
    }

    #[test]
    fn empty_extensions_render_as_object() {
        let event = Event::builder()
            .id("1")
            .source("/producer")
            .ty("ping")
            .build()
            .unwrap();
        assert_eq!(
            render(&event),
            r#"{"data": , "type": ping, "extensions": {}}"#
        );
    }

    #[test]
    fn extensions_are_sorted_and_typed() {
        let event = Event::builder()
            .id("1")
            .source("/producer")
            .ty("t")
            .data(&b"hello"[..])
            .extension("the", 42)
            .extension("heart", "yes")
            .extension("beats", true)
            .build()
            .unwrap();
        assert_eq!(
            render(&event),
            r#"{"data": hello, "type": t, "extensions": {"beats":true,"heart":"yes","the":42}}"#
        );
    }
}
