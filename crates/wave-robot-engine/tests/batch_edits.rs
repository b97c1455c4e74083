use std::collections::BTreeMap;
use std::ops::Range;

use pretty_assertions::assert_eq;
use wave_robot_engine::{
    BatchOperation, Blip, BlipContent, BundledAnnotation, ContentArg, Element, ElementType, ModifyHow,
    OperationQueue, PropertiesArg, RefsError, Restriction, SelectionDescriptor,
};

fn blip(content: &str) -> Blip {
    Blip::new("b+1", content).with_wavelet("example.com!w+1", "example.com!conv+root")
}

fn annotation_ranges(blip: &Blip, name: &str) -> Vec<(Range<usize>, String)> {
    blip.annotations()
        .get(name)
        .iter()
        .map(|annotation| (annotation.range.clone(), annotation.value.clone()))
        .collect()
}

fn element_offsets(blip: &Blip) -> Vec<(usize, ElementType)> {
    blip.elements()
        .iter()
        .map(|(offset, element)| (*offset, element.element_type))
        .collect()
}

// ============ Wrap-around arguments ============

#[test]
fn annotate_cycles_values_over_matches() {
    let mut blip = blip("\na a a");
    let mut ops: Vec<BatchOperation> = Vec::new();

    let mut refs = blip.all(&mut ops, "a");
    assert_eq!(refs.iter().count(), 3);
    refs.annotate("k", &["v1", "v2"]).unwrap();

    assert_eq!(
        annotation_ranges(&blip, "k"),
        vec![
            (1..2, "v1".to_string()),
            (3..4, "v2".to_string()),
            (5..6, "v1".to_string()),
        ]
    );
    assert_eq!(ops.len(), 1);
    let action = &ops[0].modify_action;
    assert_eq!(action.modify_how, ModifyHow::Annotate);
    assert_eq!(action.annotation_key.as_deref(), Some("k"));
    assert_eq!(
        action.values,
        Some(vec![Some("v1".to_string()), Some("v2".to_string())])
    );
    assert_eq!(ops[0].selection, SelectionDescriptor::text_query("a", None));
}

#[test]
fn annotate_without_values_uses_key() {
    let mut blip = blip("\nflag");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "flag").annotate("flag", &[]).unwrap();

    assert_eq!(annotation_ranges(&blip, "flag"), vec![(1..5, "flag".to_string())]);
}

// ============ Delete ============

#[test]
fn delete_never_removes_leading_newline() {
    let mut blip = blip("\nX");
    let mut ops: Vec<BatchOperation> = Vec::new();

    let err = blip.range(&mut ops, 0, 1).delete().map(|_| ()).unwrap_err();

    assert_eq!(err, RefsError::InvalidRange { start: 1, end: 1 });
    assert_eq!(blip.content(), "\nX");
    assert!(ops.is_empty());
}

#[test]
fn delete_from_zero_clamps_to_one() {
    let mut blip = blip("\nXYZ");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.range(&mut ops, 0, 3).delete().unwrap();

    assert_eq!(blip.content(), "\nZ");
    assert_eq!(ops[0].selection, SelectionDescriptor::explicit_range(0, 3));
}

#[test]
fn delete_every_match_and_shift_what_follows() {
    let mut blip = blip("\na b a c");
    blip.put_element(7, Element::new(ElementType::Image)).unwrap();
    blip.annotations_mut().add("lang", "en", 5..8);
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "a").delete().unwrap();

    assert_eq!(blip.content(), "\n b  c");
    assert_eq!(element_offsets(&blip), vec![(5, ElementType::Image)]);
    assert_eq!(annotation_ranges(&blip, "lang"), vec![(4..6, "en".to_string())]);
    assert_eq!(ops[0].modify_action.modify_how, ModifyHow::Delete);
    assert_eq!(ops[0].modify_action.values, None);
}

#[test]
fn delete_adjacent_element_matches() {
    let mut blip = blip("\n   x");
    for offset in 1..4 {
        blip.put_element(offset, Element::new(ElementType::Image)).unwrap();
    }
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all_elements(&mut ops, ElementType::Image, &[])
        .unwrap()
        .delete()
        .unwrap();

    assert_eq!(blip.content(), "\nx");
    assert!(blip.elements().is_empty());
    assert_eq!(ops.len(), 1);
}

#[test]
fn delete_multi_character_matches() {
    let mut blip = blip("\nfoo bar foo");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "foo").delete().unwrap();

    assert_eq!(blip.content(), "\n bar ");
}

#[test]
fn delete_removes_elements_and_annotations_in_range() {
    let mut blip = blip("\nab cd");
    blip.put_element(3, Element::new(ElementType::Gadget)).unwrap();
    blip.annotations_mut().add("style/bold", "true", 1..6);
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.range(&mut ops, 2, 4).delete().unwrap();

    assert_eq!(blip.content(), "\nacd");
    assert!(blip.elements().is_empty());
    assert_eq!(
        annotation_ranges(&blip, "style/bold"),
        vec![(1..2, "true".to_string()), (2..4, "true".to_string())]
    );
}

// ============ Replace ============

#[test]
fn same_length_replace_relocates_next_match() {
    let mut blip = blip("\ncatcat");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "cat").replace(["dog"]).unwrap();

    assert_eq!(blip.content(), "\ndogdog");
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].modify_action.values, Some(vec![Some("dog".to_string())]));
    assert_eq!(ops[0].modify_action.elements, Some(vec![None]));
}

#[test]
fn longer_and_shorter_replacements_keep_scanning() {
    let mut blip = blip("\ncat cat cat");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "cat").replace(["tiger", "ox"]).unwrap();

    assert_eq!(blip.content(), "\ntiger ox tiger");
}

#[test]
fn replacement_containing_target_is_not_rescanned() {
    let mut blip = blip("\na a");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "a").replace(["aa"]).unwrap();

    assert_eq!(blip.content(), "\naa aa");
}

#[test]
fn shorter_replacement_trims_trailing_annotations() {
    let mut blip = blip("\nhello world");
    blip.annotations_mut().add("style/bold", "true", 1..6);
    blip.annotations_mut().add("lang", "en", 7..12);
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "hello").replace(["hi"]).unwrap();

    assert_eq!(blip.content(), "\nhi world");
    assert_eq!(annotation_ranges(&blip, "style/bold"), vec![(1..3, "true".to_string())]);
    assert_eq!(annotation_ranges(&blip, "lang"), vec![(4..9, "en".to_string())]);
}

#[test]
fn replace_with_computed_content() {
    let mut blip = blip("\ncat dog cat");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "cat")
        .replace([ContentArg::computed(|matched| {
            BlipContent::from(matched.text().to_uppercase())
        })])
        .unwrap();

    assert_eq!(blip.content(), "\nCAT dog CAT");
    assert_eq!(
        ops[0].modify_action.values,
        Some(vec![Some("CAT".to_string()), Some("CAT".to_string())])
    );
}

#[test]
fn mixed_text_and_element_payloads_interleave() {
    let mut blip = blip("\nx x x");
    let mut ops: Vec<BatchOperation> = Vec::new();
    let image = Element::new(ElementType::Image).with_property("url", "x.png");

    blip.all(&mut ops, "x")
        .replace(vec![ContentArg::from("y"), ContentArg::from(image.clone())])
        .unwrap();

    assert_eq!(blip.content(), "\ny   y");
    assert_eq!(element_offsets(&blip), vec![(3, ElementType::Image)]);
    let action = &ops[0].modify_action;
    assert_eq!(action.values, Some(vec![Some("y".to_string()), None]));
    assert_eq!(action.elements, Some(vec![None, Some(image)]));
}

#[test]
fn replace_element_match_with_element() {
    let mut blip = blip("\na b");
    blip.put_element(2, Element::new(ElementType::Image)).unwrap();
    let mut ops: Vec<BatchOperation> = Vec::new();
    let gadget = Element::new(ElementType::Gadget).with_property("url", "poll.xml");

    blip.all_elements(&mut ops, ElementType::Image, &[])
        .unwrap()
        .replace([gadget.clone()])
        .unwrap();

    assert_eq!(blip.content(), "\na b");
    assert_eq!(blip.element(2), Some(&gadget));
    assert_eq!(
        ops[0].selection,
        SelectionDescriptor::element_query(ElementType::Image, BTreeMap::new(), None)
    );
}

#[test]
fn replace_text_over_element_drops_it() {
    let mut blip = blip("\na b");
    blip.put_element(2, Element::new(ElementType::Image)).unwrap();
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.range(&mut ops, 1, 4).replace(["xyz"]).unwrap();

    assert_eq!(blip.content(), "\nxyz");
    assert!(blip.elements().is_empty());
}

// ============ Insert ============

#[test]
fn insert_stamps_bundled_annotations() {
    let mut blip = blip("\na a");
    let mut ops: Vec<BatchOperation> = Vec::new();
    let bold = BundledAnnotation::list_of(&["style/bold", "true"]).unwrap();

    blip.all(&mut ops, "a")
        .insert_with_annotations(bold.clone(), ["<"])
        .unwrap();

    assert_eq!(blip.content(), "\n<a <a");
    assert_eq!(
        annotation_ranges(&blip, "style/bold"),
        vec![(1..2, "true".to_string()), (4..5, "true".to_string())]
    );
    assert_eq!(ops[0].modify_action.modify_how, ModifyHow::Insert);
    assert_eq!(ops[0].modify_action.bundled_annotations, Some(bold));
}

#[test]
fn insert_after_every_match() {
    let mut blip = blip("\ncat cat");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "cat").insert_after(["s"]).unwrap();

    assert_eq!(blip.content(), "\ncats cats");
    assert_eq!(ops[0].modify_action.modify_how, ModifyHow::InsertAfter);
}

#[test]
fn insert_after_text_containing_target_terminates() {
    let mut blip = blip("\ncat");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "cat").insert_after(["cat"]).unwrap();

    assert_eq!(blip.content(), "\ncatcat");
}

#[test]
fn insert_element_before_each_element_match() {
    let mut blip = blip("\n  ");
    blip.put_element(1, Element::new(ElementType::Image)).unwrap();
    blip.put_element(2, Element::new(ElementType::Image)).unwrap();
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all_elements(&mut ops, ElementType::Image, &[])
        .unwrap()
        .insert([Element::new(ElementType::Line)])
        .unwrap();

    assert_eq!(blip.content(), "\n\n \n ");
    assert_eq!(
        element_offsets(&blip),
        vec![
            (1, ElementType::Line),
            (2, ElementType::Image),
            (3, ElementType::Line),
            (4, ElementType::Image),
        ]
    );
}

#[test]
fn insert_shifts_annotations_and_elements_after_point() {
    let mut blip = blip("\nab");
    blip.put_element(2, Element::new(ElementType::Image)).unwrap();
    blip.annotations_mut().add("lang", "en", 2..3);
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.at(&mut ops, 1).insert(["xy"]).unwrap();

    assert_eq!(blip.content(), "\nxyab");
    assert_eq!(element_offsets(&blip), vec![(4, ElementType::Image)]);
    assert_eq!(annotation_ranges(&blip, "lang"), vec![(4..5, "en".to_string())]);
}

#[test]
fn append_adds_to_end() {
    let mut blip = blip("\nhello");
    let mut queue = OperationQueue::new();

    blip.append(&mut queue, " world").unwrap();

    assert_eq!(blip.content(), "\nhello world");
    assert_eq!(
        queue.pending()[0].params.modify_query,
        SelectionDescriptor::explicit_range(6, 7)
    );
}

#[test]
fn insert_into_empty_blip() {
    let mut blip = blip("");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all_content(&mut ops).insert(["\nfirst line"]).unwrap();

    assert_eq!(blip.content(), "\nfirst line");
    assert_eq!(ops[0].selection, SelectionDescriptor::explicit_range(0, 0));
}

// ============ Update element ============

#[test]
fn update_element_merges_properties() {
    let mut blip = blip("\n  ");
    blip.put_element(
        1,
        Element::new(ElementType::Gadget)
            .with_property("url", "poll.xml")
            .with_property("votes", "0"),
    )
    .unwrap();
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.first_element(&mut ops, ElementType::Gadget, &[Restriction::of("url", "poll.xml")])
        .unwrap()
        .update_element([PropertiesArg::from_pairs(&[("votes", "3")])])
        .unwrap();

    let merged = Element::new(ElementType::Gadget)
        .with_property("url", "poll.xml")
        .with_property("votes", "3");
    assert_eq!(blip.element(1), Some(&merged));
    assert_eq!(ops[0].modify_action.elements, Some(vec![Some(merged)]));
}

#[test]
fn update_element_with_computed_properties() {
    let mut blip = blip("\n  ");
    blip.put_element(1, Element::new(ElementType::Image).with_property("width", "10"))
        .unwrap();
    blip.put_element(2, Element::new(ElementType::Image).with_property("width", "20"))
        .unwrap();
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all_elements(&mut ops, ElementType::Image, &[])
        .unwrap()
        .update_element([PropertiesArg::computed(|matched| {
            let width: u32 = matched
                .as_element()
                .and_then(|element| element.property("width"))
                .and_then(|width| width.parse().ok())
                .unwrap_or_default();
            BTreeMap::from([("width".to_string(), (width * 2).to_string())])
        })])
        .unwrap();

    assert_eq!(blip.element(1).unwrap().property("width"), Some("20"));
    assert_eq!(blip.element(2).unwrap().property("width"), Some("40"));
}

#[test]
fn partial_failure_keeps_earlier_mutations() {
    let mut blip = blip("\n  ");
    blip.put_element(1, Element::new(ElementType::Image)).unwrap();
    let mut ops: Vec<BatchOperation> = Vec::new();

    let err = blip
        .all(&mut ops, " ")
        .update_element([PropertiesArg::from_pairs(&[("url", "b.png")])])
        .map(|_| ())
        .unwrap_err();

    assert_eq!(err, RefsError::NoElementAtPosition(2));
    assert_eq!(blip.element(1).unwrap().property("url"), Some("b.png"));
    assert!(ops.is_empty());
}

#[test]
fn partial_failure_on_out_of_bounds_match() {
    let mut blip = blip("\nab");
    let mut ops: Vec<BatchOperation> = Vec::new();

    let err = blip.range(&mut ops, 1, 9).replace(["z"]).map(|_| ()).unwrap_err();

    assert_eq!(err, RefsError::PositionOutOfBounds { start: 1, end: 9, len: 3 });
    assert_eq!(blip.content(), "\nab");
}

// ============ Clear annotation ============

#[test]
fn clear_annotation_over_matches() {
    let mut blip = blip("\nbold text bold");
    blip.annotations_mut().add("style/bold", "true", 1..15);
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all(&mut ops, "bold").clear_annotation("style/bold").unwrap();

    assert_eq!(annotation_ranges(&blip, "style/bold"), vec![(5..11, "true".to_string())]);
    assert_eq!(ops[0].modify_action.annotation_key.as_deref(), Some("style/bold"));
}

// ============ Inspection ============

#[test]
fn values_do_not_consume_matches() {
    let mut blip = blip("\na b a");
    let mut ops: Vec<BatchOperation> = Vec::new();
    let mut refs = blip.all(&mut ops, "a");

    let first = refs.values().unwrap();
    let second = refs.values().unwrap();

    assert_eq!(first, vec![BlipContent::from("a"), BlipContent::from("a")]);
    assert_eq!(first, second);
    assert_eq!(refs.value().unwrap(), Some(BlipContent::from("a")));
    assert!(!refs.is_empty());
}

#[test]
fn values_return_elements_for_element_matches() {
    let mut blip = blip("\nx y");
    let image = Element::new(ElementType::Image).with_property("url", "a.png");
    blip.put_element(2, image.clone()).unwrap();
    let mut ops: Vec<BatchOperation> = Vec::new();

    let values = blip
        .all_elements(&mut ops, ElementType::Image, &[])
        .unwrap()
        .values()
        .unwrap();

    assert_eq!(values, vec![BlipContent::Element(image)]);
}

#[test]
fn no_match_emits_nothing() {
    let mut blip = blip("\nabc");
    let mut ops: Vec<BatchOperation> = Vec::new();

    let mut refs = blip.all(&mut ops, "zzz");
    assert!(refs.is_empty());
    assert_eq!(refs.value().unwrap(), None);
    refs.replace(["x"]).unwrap();

    assert!(ops.is_empty());
    assert_eq!(blip.content(), "\nabc");
}

#[test]
fn same_selection_reused_for_second_batch() {
    let mut blip = blip("\na a");
    let mut queue = OperationQueue::new();

    let mut refs = blip.all(&mut queue, "a");
    refs.annotate("seen", &["yes"]).unwrap().replace(["b"]).unwrap();
    assert!(refs.is_empty());

    assert_eq!(blip.content(), "\nb b");
    assert_eq!(queue.len(), 2);
    assert_eq!(annotation_ranges(&blip, "seen").len(), 2);
}

#[test]
fn first_limits_to_one_match() {
    let mut blip = blip("\na a a");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.first(&mut ops, "a").replace(["b"]).unwrap();

    assert_eq!(blip.content(), "\nb a a");
    assert_eq!(ops[0].selection, SelectionDescriptor::text_query("a", Some(1)));
}

#[test]
fn all_limited_stops_after_max_hits() {
    let mut blip = blip("\na a a");
    let mut ops: Vec<BatchOperation> = Vec::new();

    blip.all_limited(&mut ops, "a", 2).replace(["b"]).unwrap();

    assert_eq!(blip.content(), "\nb b a");
}

#[test]
fn conflicting_restrictions_are_rejected() {
    let mut blip = blip("\n ");
    let mut ops: Vec<BatchOperation> = Vec::new();

    let result = blip.all_elements(
        &mut ops,
        ElementType::Gadget,
        &[Restriction::of("url", "a"), Restriction::of("url", "b")],
    );

    assert!(matches!(result, Err(RefsError::InvalidArgument(_))));
}

// ============ Operation encoding ============

#[test]
fn queued_operation_json() {
    let mut blip = blip("\nbold");
    blip.annotations_mut().add("style/bold", "true", 1..5);
    let mut queue = OperationQueue::new();

    blip.all(&mut queue, "bold").clear_annotation("style/bold").unwrap();

    insta::assert_json_snapshot!(queue.pending(), @r#"
    [
      {
        "method": "document.modify",
        "id": "op1",
        "params": {
          "waveId": "example.com!w+1",
          "waveletId": "example.com!conv+root",
          "blipId": "b+1",
          "modifyAction": {
            "modifyHow": "CLEAR_ANNOTATION",
            "annotationKey": "style/bold",
            "useMarkup": false
          },
          "modifyQuery": {
            "textQuery": {
              "target": "bold",
              "maxHits": -1
            }
          }
        }
      }
    ]
    "#);
}
