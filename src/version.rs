//! Build identification printed by `ripple --version`

/// `ripple {version} ({commit} {date}) rustc {rustc} {target}`
pub fn version() -> String {
    format!(
        "ripple {} ({} {}) rustc {} {}",
        package_version(),
        build_commit(),
        build_date(),
        rustc_version(),
        build_target()
    )
}

pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Short commit SHA, "unknown" outside a git checkout
pub fn build_commit() -> &'static str {
    option_env!("RIPPLE_COMMIT_SHA").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("RIPPLE_BUILD_DATE").unwrap_or("unknown")
}

pub fn rustc_version() -> &'static str {
    option_env!("RIPPLE_RUSTC_VERSION").unwrap_or("unknown")
}

/// Target triple the binary was compiled for
pub fn build_target() -> &'static str {
    option_env!("RIPPLE_TARGET").unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_shape() {
        let v = version();
        assert!(v.starts_with("ripple "));
        assert!(v.contains(package_version()));
        assert!(v.contains(" rustc "));
        assert!(v.ends_with(build_target()));
    }
}
