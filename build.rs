use std::process::Command;

/// Trimmed stdout of a successful command
fn capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    let stamp = |key: &str, value: Option<String>| {
        println!(
            "cargo:rustc-env=RIPPLE_{}={}",
            key,
            value.as_deref().unwrap_or("unknown")
        );
    };

    stamp("COMMIT_SHA", capture("git", &["rev-parse", "--short", "HEAD"]));
    stamp("BUILD_DATE", capture("date", &["+%Y-%m-%d"]));

    // "rustc 1.92.0 (..." -> "1.92.0"
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".into());
    stamp(
        "RUSTC_VERSION",
        capture(&rustc, &["--version"]).and_then(|s| {
            s.strip_prefix("rustc ")
                .and_then(|v| v.split_whitespace().next())
                .map(str::to_string)
        }),
    );
    stamp("TARGET", std::env::var("TARGET").ok());

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=RIPPLE_COMMIT_SHA");
}
