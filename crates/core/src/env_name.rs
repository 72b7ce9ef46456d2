//! Environment-variable naming: `toEnvVarName(photon, param)` from spec §6.

/// `env_name("git-box", "apiKey") == "GIT_BOX_API_KEY"`.
///
/// Both `photon` and `param` are normalized independently to
/// `UPPER_SNAKE_CASE` (kebab-case and camelCase both collapse to
/// underscore-separated uppercase words) and then joined with `_`.
pub fn to_env_var_name(photon: &str, param: &str) -> String {
    format!("{}_{}", upper_snake(photon), upper_snake(param))
}

/// Normalize a single identifier to `UPPER_SNAKE_CASE`.
fn upper_snake(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_lower_or_digit = false;

    for ch in input.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower_or_digit = false;
            continue;
        }

        if ch.is_uppercase() && prev_lower_or_digit && !out.ends_with('_') {
            out.push('_');
        }

        out.extend(ch.to_uppercase());
        prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
    }

    out.trim_matches('_').to_string()
}

#[cfg(test)]
#[path = "env_name_tests.rs"]
mod tests;
