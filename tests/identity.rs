use std::collections::HashSet;

use rstest::rstest;
use t0::error::{exit_codes, Error};
use t0::identity::{Identity, IdentityForm, LONG_LEN, SHORT_LEN};

const VECTOR_LONG: &str = "0192da75-c158-7d7f-be3c-d5b647bf7fa8";

#[test]
fn generated_identities_round_trip_in_both_forms() {
    for _ in 0..200 {
        let id = Identity::new();
        let short = id.encode_short();
        let long = id.encode_long();
        assert_eq!(short.len(), SHORT_LEN);
        assert_eq!(long.len(), LONG_LEN);
        assert_eq!(Identity::decode(&short).expect("short"), id);
        assert_eq!(Identity::decode(&long).expect("long"), id);
    }
}

#[test]
fn static_vector_round_trips() {
    let id = Identity::decode(VECTOR_LONG).expect("vector");
    let short = id.encode_short();
    assert_eq!(short.len(), SHORT_LEN);
    assert_eq!(IdentityForm::detect(&short), IdentityForm::Short);
    assert_eq!(Identity::decode(&short).expect("short").encode_long(), VECTOR_LONG);
}

#[test]
fn sequential_identities_sort_in_generation_order() {
    let ids: Vec<Identity> = (0..500).map(|_| Identity::new()).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let shorts: HashSet<String> = ids.iter().map(Identity::encode_short).collect();
    assert_eq!(shorts.len(), ids.len());
}

#[test]
fn short_form_is_safe_in_todo_tokens() {
    for _ in 0..200 {
        let short = Identity::new().encode_short();
        assert!(short
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }
}

#[rstest]
#[case::scenario_d("not-a-valid-uuid-format")]
#[case::empty("")]
#[case::too_short("tooshort")]
#[case::long_garbage("zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz")]
#[case::padding_char("ttttttttttttttttttttt=")]
#[case::trailing_bits("tttttttttttttttttttttu")]
fn malformed_identities_are_rejected(#[case] value: &str) {
    let err = Identity::decode(value).expect_err("should not decode");
    assert!(matches!(err, Error::InvalidIdentity(_)), "{err:?}");
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
}
