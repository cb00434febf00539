use coinpurse_client::ClientError;

pub fn render_error(error: &ClientError) -> String {
    let mut lines = vec![
        "The import could not continue.".to_string(),
        String::new(),
        format!("  Error:    {}", error.code),
        format!("  Details:  {}", error.message),
        String::new(),
        "What to do next:".to_string(),
    ];

    if error.recovery_steps.is_empty() {
        lines.push("  1. Retry the command.".to_string());
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use coinpurse_client::ClientError;

    use super::render_error;

    #[test]
    fn renders_code_details_and_numbered_steps() {
        let error = ClientError::unknown_entity("pets", &["expenses", "income"]);

        let rendered = render_error(&error);
        assert!(rendered.contains("  Error:    unknown_entity"));
        assert!(rendered.contains("  Details:  `pets` is not an importable entity."));
        assert!(rendered.contains("What to do next:"));
        assert!(rendered.contains("  1. Use one of: expenses, income."));
        assert!(rendered.contains("  2. Run `coinpurse import fields <entity>`"));
    }

    #[test]
    fn errors_without_steps_suggest_a_retry() {
        let error = ClientError::new("internal_runtime", "boom", Vec::new());
        assert!(render_error(&error).ends_with("  1. Retry the command."));
    }
}
