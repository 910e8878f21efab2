// this_file: crates/glyphrun-unicode/src/proptests.rs

use super::*;
use proptest::prelude::*;

// Property: element starts are strictly increasing and begin at 0
proptest! {
    #[test]
    fn prop_starts_ascending(s in "\\PC*") {
        let elements = TextElements::new(&s);
        if !s.is_empty() {
            prop_assert_eq!(elements.start_offsets()[0], 0);
        }
        for pair in elements.start_offsets().windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }
}

// Property: an element's start maps back to that element
proptest! {
    #[test]
    fn prop_start_round_trip(s in "\\PC*") {
        let elements = TextElements::new(&s);
        for element in 0..=elements.count() {
            let offset = elements.char_index_from_element_index(element).unwrap();
            prop_assert_eq!(elements.element_index_from_char_index(offset).unwrap(), element);
        }
    }
}

// Property: every offset lands inside the element it maps to
proptest! {
    #[test]
    fn prop_offset_inside_element(s in "\\PC*") {
        let elements = TextElements::new(&s);
        for offset in 0..elements.len_utf16() {
            let element = elements.element_index_from_char_index(offset).unwrap();
            let range = elements.element_range(element).unwrap();
            prop_assert!(range.contains(&offset));
        }
    }
}

// Property: no element boundary splits a surrogate pair
proptest! {
    #[test]
    fn prop_never_splits_surrogates(s in "\\PC*") {
        let units: Vec<u16> = s.encode_utf16().collect();
        for &start in TextElements::new(&s).start_offsets() {
            prop_assert!(!(0xDC00..=0xDFFF).contains(&units[start]));
        }
    }
}
