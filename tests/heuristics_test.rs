use invoice_courier::core::heuristics::{
    cookie_header, link_looks_like_invoice, looks_logged_in, looks_on_login_page,
    resolve_invoice_url, EMAIL_FIELD, PASSWORD_FIELD, SUBMIT_BUTTON,
};

#[test]
fn login_page_predicate_matches_known_markers() {
    assert!(looks_on_login_page("https://chat.openai.com/auth/login"));
    assert!(looks_on_login_page(
        "https://auth0.openai.com/u/login/identifier?state=abc"
    ));
    assert!(!looks_on_login_page("https://chat.openai.com/c/123"));
    assert!(!looks_on_login_page(
        "https://platform.openai.com/account/billing/payment-history"
    ));
}

#[test]
fn logged_in_predicate_requires_app_host() {
    assert!(looks_logged_in("https://chat.openai.com/c/123"));
    assert!(looks_logged_in(
        "https://platform.openai.com/account/billing/payment-history"
    ));
    // A login URL on an app host is not a session.
    assert!(!looks_logged_in("https://chat.openai.com/auth/login"));
    // An unexpected domain is neither logged in nor on a login page.
    let stray = "https://status.example.com/maintenance";
    assert!(!looks_logged_in(stray));
    assert!(!looks_on_login_page(stray));
}

#[test]
fn selector_cascades_are_ordered_exact_match_first() {
    let email: Vec<&str> = EMAIL_FIELD.candidates().collect();
    assert_eq!(
        email,
        vec![
            r#"input[name="username"]"#,
            r#"input[type="email"]"#,
            r#"input[placeholder*="mail"]"#,
        ]
    );

    let password: Vec<&str> = PASSWORD_FIELD.candidates().collect();
    assert_eq!(password[0], r#"input[name="password"]"#);
    assert_eq!(password[1], r#"input[type="password"]"#);

    assert_eq!(SUBMIT_BUTTON.candidates().count(), 2);
    assert_eq!(SUBMIT_BUTTON.name(), "submit button");
}

#[test]
fn link_matching_is_keyword_based_and_case_insensitive() {
    assert!(link_looks_like_invoice("/receipts/invoice123", ""));
    assert!(link_looks_like_invoice("/files/statement.PDF", ""));
    assert!(link_looks_like_invoice("#", "Download receipt"));
    assert!(link_looks_like_invoice("", "View INVOICE"));
    assert!(!link_looks_like_invoice("/account/settings", "Settings"));
    assert!(!link_looks_like_invoice("", ""));
}

#[test]
fn relative_href_resolves_against_platform_origin() {
    let resolved =
        resolve_invoice_url("https://platform.openai.com", "/files/invoice123.pdf").unwrap();
    assert_eq!(resolved, "https://platform.openai.com/files/invoice123.pdf");
}

#[test]
fn absolute_href_passes_through_unchanged() {
    let resolved = resolve_invoice_url(
        "https://platform.openai.com",
        "https://pay.example.com/inv/42.pdf",
    )
    .unwrap();
    assert_eq!(resolved, "https://pay.example.com/inv/42.pdf");
}

#[test]
fn bad_origin_is_an_error() {
    assert!(resolve_invoice_url("not-an-origin", "/files/x.pdf").is_err());
}

#[test]
fn cookie_header_serialization() {
    let cookies = vec![
        ("session".to_string(), "abc123".to_string()),
        ("csrf".to_string(), "xyz".to_string()),
    ];
    assert_eq!(cookie_header(&cookies), "session=abc123; csrf=xyz");
    assert_eq!(cookie_header(&[]), "");
}
