use chrono::{FixedOffset, TimeZone};
use s3access::ParseError;
use s3access::parse::{
    MAX_FIELDS, MIN_FIELDS, field_to_int, normalize, parse_line, parse_lines, tokenize,
};
use s3access::testing::{SAMPLE_LINE, log_line, sample_record};
use std::net::Ipv4Addr;

#[test]
fn tokens_keep_original_substrings_in_order() {
    let tokens = tokenize(SAMPLE_LINE);
    assert_eq!(tokens.len(), 23);
    assert_eq!(tokens[0], "bucketowner");
    assert_eq!(tokens[2], "07/Feb/2019:00:00:38 +0000");
    assert_eq!(tokens[8], "GET /key HTTP/1.1");
    assert_eq!(tokens[15], "-");
    assert_eq!(tokens[22], "TLSv1.2");

    // Every token is a verbatim slice of the line, found left to right.
    let mut from = 0;
    for token in &tokens {
        let at = SAMPLE_LINE[from..].find(token).expect("token in line") + from;
        from = at + token.len();
    }
}

#[test]
fn quoted_fields_may_contain_brackets_and_spaces() {
    let tokens = tokenize(r#"a "x [y] z" [1 2] b"#);
    assert_eq!(tokens, vec!["a", "x [y] z", "1 2", "b"]);
}

#[test]
fn literal_line_normalizes() {
    let rec = sample_record();
    assert_eq!(rec.requestdatetime, "07/Feb/2019:00:00:38 +0000");
    assert_eq!(rec.remoteip_int, 16_909_060);
    assert!(rec.is_user);
    assert!(!rec.is_assumed_role);
    assert_eq!(rec.year, 2019);
    assert_eq!(rec.month, 2);
    assert_eq!(rec.day, 7);
    assert_eq!(rec.hour, 0);
    assert_eq!(rec.bytessent, 100);
    assert_eq!(rec.objectsize, 50);
    assert_eq!(rec.totaltime, 10);
    assert_eq!(rec.turnaroundtime, 0);
    assert_eq!(rec.hostid, "SigV4");
    assert_eq!(rec.tlsversion, "-");
}

#[test]
fn dash_and_integers_in_numeric_positions() {
    for value in [0_i64, 1, 42, 2_662_992, i64::from(u32::MAX) + 7] {
        assert_eq!(field_to_int(&value.to_string(), "bytessent", 1).unwrap(), value);
    }
    assert_eq!(field_to_int("-", "totaltime", 1).unwrap(), 0);
}

#[test]
fn non_numeric_counter_names_the_field() {
    let line = SAMPLE_LINE.replace(" 100 50 ", " 100 lots ");
    let err = parse_line(&line, 9).unwrap_err();
    assert!(matches!(
        err,
        ParseError::Numeric { line: 9, field: "objectsize", ref value } if value == "lots"
    ));
}

#[test]
fn timestamp_fields_recombine_to_the_same_instant() {
    let line = log_line(
        "b",
        "REST.GET.OBJECT",
        "svc",
        "10.0.0.1",
        "31/Dec/2018:23:59:07 -0500",
    );
    let rec = parse_line(&line, 1).unwrap().unwrap();
    assert_eq!((rec.year, rec.month, rec.day), (2018, 12, 31));
    assert_eq!((rec.hour, rec.minute, rec.second), (23, 59, 7));

    let offset = FixedOffset::west_opt(5 * 3600).unwrap();
    let rebuilt = offset
        .with_ymd_and_hms(
            i32::try_from(rec.year).unwrap(),
            rec.month as u32,
            rec.day as u32,
            rec.hour as u32,
            rec.minute as u32,
            rec.second as u32,
        )
        .unwrap();
    assert_eq!(rebuilt.timestamp(), rec.ts);
    assert_eq!(rec.datetime, "2018-12-31T23:59:07-05:00");
}

#[test]
fn bad_timestamp_is_rejected() {
    let line = SAMPLE_LINE.replace("07/Feb/2019", "07/Foo/2019");
    assert!(matches!(parse_line(&line, 1), Err(ParseError::Timestamp { line: 1, .. })));
}

#[test]
fn remote_ip_round_trips() {
    for ip in ["0.0.0.0", "1.2.3.4", "10.20.30.40", "192.0.2.255", "255.255.255.255"] {
        let line = log_line("b", "REST.GET.OBJECT", "svc", ip, "07/Feb/2019:00:00:38 +0000");
        let rec = parse_line(&line, 1).unwrap().unwrap();
        assert_eq!(Ipv4Addr::from(rec.remoteip_int).to_string(), ip);
        assert_eq!(rec.remoteip, ip);
    }
}

#[test]
fn requester_flags_are_substring_tests() {
    let time = "07/Feb/2019:00:00:38 +0000";
    let both = log_line("b", "op", "arn:aws:sts::1:assumed-role/user-admin", "1.1.1.1", time);
    let rec = parse_line(&both, 1).unwrap().unwrap();
    assert!(rec.is_assumed_role && rec.is_user);

    let neither = log_line("b", "op", "-", "1.1.1.1", time);
    let rec = parse_line(&neither, 1).unwrap().unwrap();
    assert!(!rec.is_assumed_role && !rec.is_user);
}

#[test]
fn field_count_bounds() {
    let full = log_line("b", "op", "r", "1.1.1.1", "07/Feb/2019:00:00:38 +0000");
    let tokens = tokenize(&full);
    assert_eq!(tokens.len(), MAX_FIELDS);

    assert!(normalize(&tokens[..MIN_FIELDS], 1).is_ok());
    assert!(matches!(
        normalize(&tokens[..MIN_FIELDS - 1], 3),
        Err(ParseError::FieldCount { line: 3, found, .. }) if found == MIN_FIELDS - 1
    ));

    let mut extra = tokens.clone();
    extra.push("surplus");
    assert!(matches!(normalize(&extra, 1), Err(ParseError::FieldCount { .. })));
}

#[test]
fn parse_lines_skips_blanks_and_stops_at_first_bad_line() -> anyhow::Result<()> {
    let good = format!("{SAMPLE_LINE}\n\n{SAMPLE_LINE}\r\n");
    assert_eq!(parse_lines(good.as_bytes())?.len(), 2);

    let bad = format!("{SAMPLE_LINE}\n{SAMPLE_LINE}\ngarbage\n{SAMPLE_LINE}\n");
    let err = parse_lines(bad.as_bytes()).unwrap_err();
    assert!(format!("{err:#}").contains("line 3"));
    Ok(())
}
