use regex::Regex;
use std::collections::HashMap;

/// Context for variable interpolation into job script lines.
#[derive(Debug, Clone, Default)]
pub struct InterpolationContext {
    /// Merged event + pipeline + job variables
    pub variables: HashMap<String, String>,
    /// Secret values to mask in streamed output
    pub secrets: HashMap<String, String>,
}

impl InterpolationContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpolate variables in a string.
    ///
    /// Supports `$VAR` and `${VAR}`. Unknown variables expand to the
    /// empty string rather than erroring, matching rule-evaluation
    /// semantics for unset fields.
    pub fn interpolate(&self, input: &str) -> String {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .unwrap();

        re.replace_all(input, |caps: &regex::Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            self.variables.get(name).cloned().unwrap_or_default()
        })
        .to_string()
    }

    /// Mask secret values in the input string.
    pub fn mask_secrets(&self, input: &str) -> String {
        let mut output = input.to_string();
        for value in self.secrets.values() {
            if !value.is_empty() {
                output = output.replace(value, "***");
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx() -> InterpolationContext {
        let mut ctx = InterpolationContext::new();
        ctx.variables.insert("TARGET".to_string(), "esp32".to_string());
        ctx.secrets.insert("TOKEN".to_string(), "hunter2".to_string());
        ctx
    }

    #[test]
    fn test_plain_and_braced() {
        assert_eq!(ctx().interpolate("build $TARGET"), "build esp32");
        assert_eq!(ctx().interpolate("build ${TARGET}-s3"), "build esp32-s3");
    }

    #[test]
    fn test_unknown_expands_empty() {
        assert_eq!(ctx().interpolate("x$MISSING!"), "x!");
    }

    #[test]
    fn test_mask_secrets() {
        assert_eq!(ctx().mask_secrets("token is hunter2"), "token is ***");
    }
}
