// Copyright (c) 2026 ISCC HUB Contributors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

use iscc_hub::core::canonical::canonical_note_bytes;
use proptest::prelude::*;

fn note_json(a: &str, b: &str, proof: &str) -> Vec<u8> {
    format!(
        r#"{{"b":"{b}","a":"{a}","signature":{{"proof":"{proof}","pubkey":"k"}}}}"#
    )
    .into_bytes()
}

proptest! {
    #[test]
    fn prop_canonicalization_is_deterministic(
        a in "[a-z]{1,8}", b in "[a-z]{1,8}", proof in "[a-f0-9]{1,16}"
    ) {
        let note = note_json(&a, &b, &proof);
        let c1 = canonical_note_bytes(&note).unwrap();
        let c2 = canonical_note_bytes(&note).unwrap();
        prop_assert_eq!(c1, c2);
    }

    #[test]
    fn prop_proof_value_never_affects_canonical_form(
        a in "[a-z]{1,8}", b in "[a-z]{1,8}", proof1 in "[a-f0-9]{1,16}", proof2 in "[a-f0-9]{1,16}"
    ) {
        let c1 = canonical_note_bytes(&note_json(&a, &b, &proof1)).unwrap();
        let c2 = canonical_note_bytes(&note_json(&a, &b, &proof2)).unwrap();
        prop_assert_eq!(c1, c2);
    }

    #[test]
    fn prop_changing_any_other_field_changes_canonical_form(
        a in "[a-z]{1,8}", b in "[a-z]{1,8}", b2 in "[a-z]{1,8}", proof in "[a-f0-9]{1,16}"
    ) {
        prop_assume!(b != b2);
        let c1 = canonical_note_bytes(&note_json(&a, &b, &proof)).unwrap();
        let c2 = canonical_note_bytes(&note_json(&a, &b2, &proof)).unwrap();
        prop_assert_ne!(c1, c2);
    }
}
