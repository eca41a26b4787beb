use super::bind_ex::{BindEx, BindExFrame};
use super::envelope::{MessageDecode, MessageEncode, split_envelope, tag};
use crate::engine::codec::cell_codec::CellValue;
use crate::engine::codec::column_type::oid;
use crate::engine::codec::payload_reader::PayloadView;
use crate::engine::codec::row_packer::RowPacker;
use crate::engine::errors::WireError;
use crate::test_helpers::factory::{Factory, OwnedCell};

fn host_rows(host: &str, count: usize) -> Vec<Vec<OwnedCell>> {
    let oids = Factory::layout().oids();
    Factory::rows(&oids)
        .with_max_text(20)
        .with_value(3, OwnedCell::Bytes(host.as_bytes().to_vec()))
        .create_list(count)
}

#[test]
fn rows_are_grouped_by_primary_tag() {
    let layout = Factory::layout().create();
    let packer = RowPacker::new(layout.clone());
    let mut bind = BindEx::new("", "ins_cpu");

    let a = host_rows("host_a", 3);
    let b = host_rows("host_b", 2);
    for row in OwnedCell::borrow_rows(&a).iter().chain(&OwnedCell::borrow_rows(&b)) {
        bind.push_row(&packer, row).unwrap();
    }
    assert_eq!(bind.len(), 2);
    bind.seal().unwrap();

    let keys: Vec<&str> = bind.payloads().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["host_a", "host_b"]);
    assert_eq!(bind.payload("host_a").unwrap().row_num(), 3);

    let view = PayloadView::parse(&layout, bind.payload("host_b").unwrap().as_bytes()).unwrap();
    assert_eq!(view.row_num, 2);
    assert_eq!(view.tag(3).unwrap(), Some(&b"host_b"[..]));
}

#[test]
fn encode_then_decode_frame() {
    let layout = Factory::layout().create();
    let packer = RowPacker::new(layout.clone());
    let mut bind = BindEx::new("p1", "ins_cpu");
    for row in OwnedCell::borrow_rows(&host_rows("host_a", 4)) {
        bind.push_row(&packer, &row).unwrap();
    }
    bind.seal().unwrap();

    let mut buf = Vec::new();
    bind.encode(&mut buf).unwrap();
    let env = split_envelope(&buf).unwrap().unwrap();
    assert_eq!(env.tag, tag::BIND_EX);
    assert_eq!(env.wire_len(), buf.len());

    let frame = BindExFrame::decode_envelope(env).unwrap();
    assert_eq!(frame.portal, "p1");
    assert_eq!(frame.statement, "ins_cpu");
    assert_eq!(frame.payloads.len(), 1);
    let (key, payload) = frame.payloads[0];
    assert_eq!(key, "host_a");
    assert_eq!(payload, bind.payload("host_a").unwrap().as_bytes());
    assert_eq!(PayloadView::parse(&layout, payload).unwrap().row_num, 4);

    let mut again = Vec::new();
    frame.encode(&mut again).unwrap();
    assert_eq!(again, buf);
}

#[test]
fn body_layout_is_count_then_entries() {
    let frame = BindExFrame {
        portal: "",
        statement: "s",
        payloads: vec![("k1", &[1, 2][..]), ("k2", &[][..])],
    };
    let mut buf = Vec::new();
    frame.encode(&mut buf).unwrap();
    let mut expected = b"\0s\0".to_vec();
    expected.extend_from_slice(&2_i16.to_be_bytes());
    expected.extend_from_slice(b"k1\0");
    expected.extend_from_slice(&2_i32.to_be_bytes());
    expected.extend_from_slice(&[1, 2]);
    expected.extend_from_slice(b"k2\0");
    expected.extend_from_slice(&0_i32.to_be_bytes());
    assert_eq!(&buf[5..], expected.as_slice());
}

#[test]
fn decode_is_strict() {
    let frame = BindExFrame {
        portal: "",
        statement: "s",
        payloads: vec![("k", &[9, 9, 9][..])],
    };
    let mut buf = Vec::new();
    frame.encode(&mut buf).unwrap();
    let body = &buf[5..];

    for cut in 0..body.len() {
        assert!(BindExFrame::decode(&body[..cut]).is_err(), "cut {cut}");
    }
    let mut long = body.to_vec();
    long.push(0);
    assert!(BindExFrame::decode(&long).is_err());

    let mut negative = b"\0s\0".to_vec();
    negative.extend_from_slice(&(-1_i16).to_be_bytes());
    assert!(matches!(
        BindExFrame::decode(&negative),
        Err(WireError::MalformedMessage { message_type: "BindEx", .. })
    ));
}

#[test]
fn reset_keeps_groups_but_drops_rows() {
    let packer = RowPacker::new(Factory::layout().create());
    let mut bind = BindEx::new("", "ins_cpu");
    for row in OwnedCell::borrow_rows(&host_rows("host_a", 2)) {
        bind.push_row(&packer, &row).unwrap();
    }
    bind.seal().unwrap();
    let capacity = bind.payload("host_a").unwrap().capacity();

    bind.reset();
    assert!(bind.is_empty());
    assert_eq!(bind.payload("host_a").unwrap().capacity(), capacity);

    // empty groups are left out of the message
    let mut buf = Vec::new();
    bind.encode(&mut buf).unwrap();
    assert_eq!(&buf[5..], b"\0ins_cpu\0\0\0");
    assert!(bind.payload_mut("host_a").unwrap().is_empty());
}

#[test]
fn a_bad_row_does_not_disturb_its_group() {
    let layout = Factory::layout()
        .with_columns(&[(oid::INT4, 4), (oid::VARCHAR, 12)])
        .with_tag_index(1)
        .with_primary_tags(&[1])
        .create();
    let packer = RowPacker::new(layout.clone());
    let mut bind = BindEx::new("", "s");

    let good = [OwnedCell::Int(1), OwnedCell::Bytes(b"d1".to_vec())];
    let bad = [OwnedCell::Int(i64::MAX), OwnedCell::Bytes(b"d1".to_vec())];
    fn cells(row: &[OwnedCell]) -> Vec<CellValue<'_>> {
        row.iter().map(OwnedCell::as_cell).collect()
    }

    bind.push_row(&packer, &cells(&good)).unwrap();
    let err = bind.push_row(&packer, &cells(&bad)).unwrap_err();
    assert!(matches!(err, WireError::Cell { row: 1, column: 0, .. }));
    bind.push_row(&packer, &cells(&good)).unwrap();
    bind.seal().unwrap();

    let view = PayloadView::parse(&layout, bind.payload("d1").unwrap().as_bytes()).unwrap();
    assert_eq!(view.row_num, 2);
}

#[test]
fn look_alike_tags_get_their_own_groups() {
    let layout = Factory::layout()
        .with_columns(&[(oid::INT4, 4), (oid::VARCHAR, 8), (oid::VARCHAR, 8)])
        .with_tag_index(1)
        .with_primary_tags(&[1, 2])
        .create();
    let packer = RowPacker::new(layout.clone());
    let mut bind = BindEx::new("", "s");

    let rows = [
        [OwnedCell::Int(1), OwnedCell::Bytes(b"a,b".to_vec()), OwnedCell::Bytes(b"c".to_vec())],
        [OwnedCell::Int(2), OwnedCell::Bytes(b"a".to_vec()), OwnedCell::Bytes(b"b,c".to_vec())],
        [OwnedCell::Int(3), OwnedCell::Bytes(vec![0xff]), OwnedCell::Bytes(b"c".to_vec())],
        [OwnedCell::Int(4), OwnedCell::Bytes(vec![0xfe]), OwnedCell::Bytes(b"c".to_vec())],
    ];
    for row in &rows {
        let cells: Vec<CellValue<'_>> = row.iter().map(OwnedCell::as_cell).collect();
        bind.push_row(&packer, &cells).unwrap();
    }
    assert_eq!(bind.len(), 4);
    bind.seal().unwrap();

    for ((_, buf), row) in bind.payloads().zip(&rows) {
        let view = PayloadView::parse(&layout, buf.as_bytes()).unwrap();
        assert_eq!(view.row_num, 1);
        let OwnedCell::Bytes(first) = &row[1] else { unreachable!() };
        assert_eq!(view.tag(1).unwrap(), Some(first.as_slice()));
    }
}

#[test]
fn encode_requires_a_seal_after_new_rows() {
    let packer = RowPacker::new(Factory::layout().create());
    let mut bind = BindEx::new("", "ins_cpu");
    for row in OwnedCell::borrow_rows(&host_rows("host_a", 2)) {
        bind.push_row(&packer, &row).unwrap();
    }
    bind.seal().unwrap();
    bind.reset();
    for row in OwnedCell::borrow_rows(&host_rows("host_a", 3)) {
        bind.push_row(&packer, &row).unwrap();
    }
    assert!(!bind.is_sealed());

    let mut buf = Vec::new();
    assert!(matches!(
        bind.encode(&mut buf),
        Err(WireError::MalformedMessage { message_type: "BindEx", .. })
    ));
    assert!(buf.is_empty());

    bind.seal().unwrap();
    bind.encode(&mut buf).unwrap();
    let frame = BindExFrame::decode_envelope(split_envelope(&buf).unwrap().unwrap()).unwrap();
    let layout = Factory::layout().create();
    let view = PayloadView::parse(&layout, frame.payloads[0].1).unwrap();
    assert_eq!(view.row_num, 3);
}
