//! Body codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use wshttp_core::protocol::sign::{decode, encode, try_decode};

use vector_loader::load_sign_cases;

#[test]
fn sign_vectors() {
    for case in load_sign_cases() {
        let tag = format!("sign={:?} plain={:?}", case.sign, case.plain);

        if case.unknown {
            assert_eq!(encode(&case.sign, &case.plain), "", "{tag}");
            assert_eq!(decode(&case.sign, &case.plain), "", "{tag}");
            assert_eq!(try_decode(&case.sign, &case.plain).unwrap_err().code(), "UNKNOWN_SIGN", "{tag}");
            continue;
        }

        assert_eq!(encode(&case.sign, &case.plain), case.encoded, "{tag}");
        assert_eq!(decode(&case.sign, &case.encoded), case.plain, "{tag}");
    }
}
