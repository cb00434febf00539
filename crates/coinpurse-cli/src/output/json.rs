use std::io;

use coinpurse_client::contracts::envelope::failure_from_error;
use coinpurse_client::{ClientError, SuccessEnvelope};
use serde::Serialize;

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    serialize_json_pretty(success)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&failure_from_error(error))
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use coinpurse_client::{ClientError, SuccessEnvelope};
    use serde_json::{Value, json};

    use super::{render_error_json, render_success_json};

    #[test]
    fn success_json_is_the_envelope() {
        let payload = SuccessEnvelope {
            ok: true,
            command: "import list".to_string(),
            version: "0.1.0".to_string(),
            data: json!({"rows": []}),
        };

        let rendered = render_success_json(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            let parsed: Result<Value, _> = serde_json::from_str(&text);
            assert!(parsed.is_ok());
            if let Ok(value) = parsed {
                assert_eq!(value["ok"], Value::Bool(true));
                assert_eq!(value["command"], "import list");
                assert_eq!(value["version"], "0.1.0");
                assert!(value["data"]["rows"].is_array());
            }
        }
    }

    #[test]
    fn error_json_carries_code_steps_and_data() {
        let error = ClientError::nothing_to_import(2, 1);
        let rendered = render_error_json(&error);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            let parsed: Result<Value, _> = serde_json::from_str(&text);
            assert!(parsed.is_ok());
            if let Ok(value) = parsed {
                assert_eq!(value["ok"], Value::Bool(false));
                assert_eq!(value["error"]["code"], "nothing_to_import");
                assert!(value["error"]["recovery_steps"].is_array());
                assert_eq!(value["data"]["rows_duplicate"], 2);
            }
        }
    }
}
