use crate::command::CommandInfo;
use crate::parsing::ParseError;
use crate::parsing::schema::{FieldKind, FieldSpec, Schema};
use std::fmt;

const FIELD_INDENT: &str = "    ";
const DETAIL_INDENT: &str = "        ";

/// Usage text for one command, built fresh every time it is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpReport {
    lines: Vec<String>,
}

impl HelpReport {
    /// Flags are listed before positionals regardless of declaration order. With `errors`
    /// an `Errors during parsing:` block follows; help requests are not listed there.
    pub fn build(info: &CommandInfo, schema: &Schema, errors: Option<&[ParseError]>) -> Self {
        let mut lines = vec![
            format!("Command: {}", info.name),
            info.help.clone(),
            String::new(),
            format!("Aliases: {}", info.aliases.join(", ")),
            format!("Useable by: {}", info.allowed_caller),
            format!("Permissions: {}", info.permissions.join(", ")),
            format!("Command usage: {} {}", info.name, info.syntax),
            "Parameters:".to_string(),
        ];

        for field in schema.flags().chain(schema.positionals()) {
            if field.hidden {
                continue;
            }
            field_block(field, &mut lines);
        }

        if let Some(errors) = errors {
            lines.push("Errors during parsing:".to_string());
            lines.extend(
                errors
                    .iter()
                    .filter(|e| !e.kind.is_help_request())
                    .map(ToString::to_string),
            );
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for HelpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

fn field_block(field: &FieldSpec, lines: &mut Vec<String>) {
    let spec = match &field.kind {
        FieldKind::Flag { short, long } => {
            let forms: Vec<String> = short
                .map(|c| format!("-{c}"))
                .into_iter()
                .chain(long.as_ref().map(|l| format!("--{l}")))
                .collect();
            if forms.is_empty() {
                format!("--{}", field.name)
            } else {
                forms.join(", ")
            }
        }
        FieldKind::Positional { index, max } => {
            let first = index + 1;
            match max {
                Some(max) if *max > 1 => format!("{} pos. {first}-{}", field.name, index + max),
                Some(_) => format!("{} pos. {first}", field.name),
                None => format!("{} pos. {first}-...", field.name),
            }
        }
    };

    lines.push(format!("{FIELD_INDENT}{spec}"));
    lines.push(format!("{DETAIL_INDENT}{}", field.help));

    if !field.enum_values.is_empty() {
        let values: Vec<String> = field
            .enum_values
            .iter()
            .enumerate()
            .map(|(ordinal, name)| format!("{name} ({ordinal})"))
            .collect();
        lines.push(format!("{DETAIL_INDENT}Possible values: {}", values.join(", ")));
    }

    lines.push(String::new());
}
