//! Integration tests for the copy-on-write handle and its views.

use message::{make_message, Message, MessageBuilder, ValueMatcher};

#[test]
fn cloned_handles_share_storage_until_one_mutates() {
    let original = make_message!(1i64, "shared".to_string());
    let mut copy = original.clone();
    assert!(original.shares_storage(&copy));

    *copy.get_mut_as::<i64>(0).unwrap() = 2;
    assert!(!original.shares_storage(&copy));
    assert_eq!(original.get_as::<i64>(0), Some(&1));
    assert_eq!(copy.get_as::<i64>(0), Some(&2));
    // The untouched element was deep-copied along with the rest.
    assert_eq!(copy.get_as::<String>(1).map(String::as_str), Some("shared"));
}

#[test]
fn unique_handle_mutates_in_place() {
    let mut msg = make_message!(5u32);
    assert!(!msg.is_shared());
    *msg.get_mut_as::<u32>(0).unwrap() = 6;
    assert_eq!(msg.get_as::<u32>(0), Some(&6));
}

#[test]
fn force_unshare_detaches_eagerly() {
    let a = make_message!(1i8);
    let mut b = a.clone();
    b.force_unshare();
    assert!(!a.shares_storage(&b));
    assert_eq!(a, b);
}

#[test]
fn typed_access_is_checked() {
    let msg = make_message!(1i64, "x".to_string());
    assert_eq!(msg.get_as::<i64>(0), Some(&1));
    assert_eq!(msg.get_as::<i32>(0), None); // wrong type
    assert_eq!(msg.get_as::<i64>(2), None); // out of bounds
    let mut msg = msg;
    assert!(msg.get_mut_as::<bool>(1).is_none());
    assert!(msg.get_mut_as::<i64>(9).is_none());
}

#[test]
fn failed_mutable_access_does_not_unshare() {
    let a = make_message!(1i64);
    let mut b = a.clone();
    assert!(b.get_mut_as::<bool>(0).is_none());
    assert!(a.shares_storage(&b));
}

#[test]
fn slicing_ops_agree_with_each_other() {
    let msg = make_message!(1i64, 2i64, 3i64, 4i64, 5i64);
    assert_eq!(msg.drop_left(2), make_message!(3i64, 4i64, 5i64));
    assert_eq!(msg.drop_right(2), make_message!(1i64, 2i64, 3i64));
    assert_eq!(msg.take(2), make_message!(1i64, 2i64));
    assert_eq!(msg.take_right(2), make_message!(4i64, 5i64));
    assert_eq!(msg.take(0), Message::default());
    assert_eq!(msg.drop_left(0), msg);
    assert_eq!(msg.drop_left(7), Message::default());
    assert_eq!(msg.take(99), msg);
}

#[test]
fn select_validates_indices() {
    let msg = make_message!(1u8, 2u8);
    assert!(msg.select(&[0, 5]).is_none());
    assert_eq!(msg.select(&[]).unwrap(), Message::default());
    assert_eq!(msg.select(&[1]).unwrap(), make_message!(2u8));
}

#[test]
fn concat_matches_splice_and_direct_construction() {
    let a = make_message!(1i64, "mid".to_string());
    let b = make_message!(true);
    let direct = make_message!(1i64, "mid".to_string(), true);

    let eager = Message::concat(&[a.clone(), b.clone()]).unwrap();
    let lazy = Message::splice(&[a.clone(), b.clone()]);
    assert_eq!(eager, direct);
    assert_eq!(lazy, direct);
    assert_eq!(eager.token(), direct.token());
    assert_eq!(lazy.token(), direct.token());

    // Eager concat owns fresh storage; lazy splice keeps operands shared.
    assert!(!a.is_shared() || lazy.len() > 0);
    assert_eq!(Message::concat(&[]).unwrap(), Message::default());
}

#[test]
fn views_of_views_still_resolve_elements() {
    let msg = make_message!(0u64, 1u64, 2u64, 3u64, 4u64, 5u64);
    let sliced = msg.drop_left(1).drop_right(1).take_right(3);
    assert_eq!(sliced, make_message!(2u64, 3u64, 4u64));

    let spliced = Message::splice(&[sliced.clone(), sliced.take(1)]);
    assert_eq!(spliced, make_message!(2u64, 3u64, 4u64, 2u64));
}

#[test]
fn equality_is_element_wise() {
    assert_eq!(make_message!(1i64, 2i64), make_message!(1i64, 2i64));
    assert_ne!(make_message!(1i64, 2i64), make_message!(1i64, 3i64));
    assert_ne!(make_message!(1i64), make_message!(1i32)); // same bits, different type
    assert_ne!(make_message!(1i64), make_message!(1i64, 1i64));
    assert_eq!(Message::default(), Message::default());
}

#[test]
fn equality_crosses_construction_paths() {
    let direct = make_message!(8i64, "eight".to_string());
    let mut builder = MessageBuilder::new();
    builder.append(8i64).append("eight".to_string());
    let built = builder.move_to_message().unwrap();
    let view = make_message!(7i64, 8i64, "eight".to_string(), false)
        .select(&[1, 2])
        .unwrap();
    assert_eq!(built, direct);
    assert_eq!(view, direct);
}

#[test]
fn has_types_and_type_at_report_the_shape() {
    let msg = make_message!(1i64, "s".to_string());
    let expected = msg.types();
    assert!(msg.has_types(expected.ids()));
    assert!(!msg.has_types(&expected.ids()[..1]));
    assert_eq!(msg.type_at(0), Some(expected.ids()[0]));
    assert_eq!(msg.type_at(2), None);
    assert!(Message::default().has_types(&[]));
}

#[test]
fn display_renders_a_tuple() {
    let msg = make_message!(42i64, "hi".to_string(), true);
    assert_eq!(msg.to_string(), "(42, \"hi\", true)");
    assert_eq!(Message::default().to_string(), "()");
    assert_eq!(format!("{msg:?}"), "Message(42, \"hi\", true)");
}

#[test]
fn token_distinguishes_order_and_arity() {
    let ab = make_message!(1i64, "x".to_string());
    let ba = make_message!("x".to_string(), 1i64);
    let a = make_message!(1i64);
    assert_ne!(ab.token(), ba.token());
    assert_ne!(ab.token(), a.token());
    assert_eq!(ab.token(), make_message!(2i64, "y".to_string()).token());
}

#[test]
fn value_matching_compares_types_and_values() {
    let msg = make_message!(42i64, "hi".to_string(), true);
    assert!(msg.matches(&[
        ValueMatcher::of(42i64).unwrap(),
        ValueMatcher::of("hi".to_string()).unwrap(),
        ValueMatcher::of(true).unwrap(),
    ]));
    // Wrong value at the first position.
    assert!(!msg.matches(&[
        ValueMatcher::of(41i64).unwrap(),
        ValueMatcher::of("hi".to_string()).unwrap(),
        ValueMatcher::of(true).unwrap(),
    ]));
    // Same bit pattern, different type.
    assert!(!msg.matches(&[
        ValueMatcher::of(42u64).unwrap(),
        ValueMatcher::any(),
        ValueMatcher::any(),
    ]));
}

#[test]
fn value_matching_placeholders_match_any_element() {
    let msg = make_message!(42i64, "hi".to_string(), true);
    assert!(msg.matches(&[
        ValueMatcher::any(),
        ValueMatcher::of("hi".to_string()).unwrap(),
        ValueMatcher::any(),
    ]));
    // Placeholders never relax the length requirement.
    assert!(!msg.matches(&[ValueMatcher::any(), ValueMatcher::any()]));
    assert!(!msg.matches(&[]));
    assert!(Message::default().matches(&[]));
}

#[test]
fn value_matching_sees_through_views() {
    let tail = make_message!(1i64, "hi".to_string(), true).drop_left(1);
    assert!(tail.matches(&[
        ValueMatcher::of("hi".to_string()).unwrap(),
        ValueMatcher::of(true).unwrap(),
    ]));
    assert!(!tail.matches(&[
        ValueMatcher::of("bye".to_string()).unwrap(),
        ValueMatcher::any(),
    ]));
}
