use types::StudentRecord;

/// Leading digit run of a class label ("10A" -> "10"), falling back to the
/// leading letter run so labels like "Nursery" still group into a grade.
pub fn grade_key(class_label: &str) -> String {
    let label = class_label.trim();
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits;
    }
    label.chars().take_while(|c| c.is_alphabetic()).collect()
}

/// True when two students must not sit in adjacent seats.
pub fn are_related(a: &StudentRecord, b: &StudentRecord) -> bool {
    related_labels(&a.class, &a.section, &b.class, &b.section)
}

pub fn related_labels(class_a: &str, section_a: &str, class_b: &str, section_b: &str) -> bool {
    let class_a = class_a.trim();
    let class_b = class_b.trim();
    let section_a = section_a.trim().to_uppercase();
    let section_b = section_b.trim().to_uppercase();

    if class_a == class_b && section_a == section_b {
        return true;
    }

    let grade_a = grade_key(class_a);
    if grade_a.is_empty() || grade_a != grade_key(class_b) {
        return false;
    }
    match (section_a.is_empty(), section_b.is_empty()) {
        (true, true) => false,
        (true, false) | (false, true) => true,
        (false, false) => section_a != section_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use types::{StudentId, StudentRecord};

    fn student(class: &str, section: &str) -> StudentRecord {
        StudentRecord {
            id: StudentId("s".into()),
            name: "s".into(),
            class: class.into(),
            section: section.into(),
        }
    }

    #[test]
    fn same_class_and_section_is_related() {
        assert!(are_related(&student("10", "A"), &student("10", "A")));
    }

    #[test]
    fn sections_of_one_grade_are_related() {
        assert!(are_related(&student("5", "A"), &student("5", "B")));
        assert!(are_related(&student("10A", "X"), &student("10B", "Y")));
    }

    #[test]
    fn different_grades_are_unrelated() {
        assert!(!are_related(&student("7", "A"), &student("8", "A")));
        assert!(!are_related(&student("9", ""), &student("10", "")));
    }

    #[test]
    fn missing_section_counts_as_a_differing_section() {
        assert!(are_related(&student("5", "A"), &student("5", "")));
        assert!(are_related(&student("5", ""), &student("5", "B")));
    }

    #[test]
    fn packed_labels_share_a_grade_but_stay_unrelated() {
        // "5A" and "5B" with no section field: same grade "5", both
        // sections empty, labels differ.
        assert!(!are_related(&student("5A", ""), &student("5B", "")));
        assert!(are_related(&student("5A", ""), &student("5A", "")));
    }

    #[test]
    fn letter_prefix_grades_group_together() {
        assert!(are_related(&student("Nursery", "A"), &student("Nursery", "B")));
        assert!(!are_related(&student("Nursery", "A"), &student("Prep", "A")));
    }

    #[test]
    fn unparseable_labels_never_share_a_grade() {
        assert!(!are_related(&student("+", ""), &student("-", "")));
        assert!(!are_related(&student("12", "A"), &student("#", "A")));
        // Exact label match still wins even when no grade can be parsed.
        assert!(are_related(&student("+", ""), &student("+", "")));
    }

    #[test]
    fn labels_are_normalized_before_comparison() {
        assert!(are_related(&student(" 10 ", "a"), &student("10", "A  ")));
    }

    #[test]
    fn grade_key_prefers_digits() {
        assert_eq!(grade_key("10A"), "10");
        assert_eq!(grade_key("  7 "), "7");
        assert_eq!(grade_key("Nursery"), "Nursery");
        assert_eq!(grade_key("KG1"), "KG");
        assert_eq!(grade_key("+"), "");
        assert_eq!(grade_key(""), "");
    }

    proptest! {
        #[test]
        fn predicate_is_symmetric(ca in ".*", sa in ".*", cb in ".*", sb in ".*") {
            let a = student(&ca, &sa);
            let b = student(&cb, &sb);
            prop_assert_eq!(are_related(&a, &b), are_related(&b, &a));
        }

        #[test]
        fn every_student_is_related_to_itself(class in ".*", section in ".*") {
            let a = student(&class, &section);
            let b = student(&class, &section);
            prop_assert!(are_related(&a, &b));
        }
    }
}
