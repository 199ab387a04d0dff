use std::env;

/// Deployment stage. Anything other than `prod` lands on the dev table.
pub fn stage() -> &'static str {
    stage_from(env::var("STAGE").ok().as_deref())
}

/// Single-table name, `TABLE_NAME` override first, then stage suffixing.
pub fn table_name() -> String {
    env::var("TABLE_NAME").unwrap_or_else(|_| format!("labor-pool-{}", stage()))
}

fn stage_from(value: Option<&str>) -> &'static str {
    match value {
        Some("prod") => "prod",
        _ => "dev",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prod_stage_must_be_exact() {
        assert_eq!(stage_from(Some("prod")), "prod");
        assert_eq!(stage_from(Some("production")), "dev");
        assert_eq!(stage_from(Some("staging")), "dev");
        assert_eq!(stage_from(None), "dev");
    }
}
