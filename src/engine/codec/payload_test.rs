use super::layout::{HEAD_SIZE, ROW_NUM_OFFSET};
use super::payload::*;
use crate::engine::errors::WireError;

#[test]
fn extend_keeps_written_bytes() {
    let mut buf = PayloadBuffer::with_capacity(4);
    buf.data_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);

    buf.extend(8);
    assert_eq!(buf.capacity(), 12);
    assert_eq!(&buf.data_mut()[..4], &[1, 2, 3, 4]);
    assert!(buf.data_mut()[4..].iter().all(|&b| b == 0));

    buf.extend(0);
    assert_eq!(buf.capacity(), 12);
}

#[test]
fn ensure_capacity_grows_by_at_least_the_step() {
    let mut buf = PayloadBuffer::with_capacity(16);
    buf.ensure_capacity(10, 100);
    assert_eq!(buf.capacity(), 16);

    buf.ensure_capacity(20, 100);
    assert_eq!(buf.capacity(), 116);

    buf.ensure_capacity(500, 100);
    assert_eq!(buf.capacity(), 500);
}

#[test]
fn reset_rewinds_cursors_and_keeps_the_allocation() {
    let mut buf = PayloadBuffer::with_capacity(64);
    buf.tail = 50;
    buf.head_tail = 46;
    buf.row_num = 3;
    assert!(buf.has_header());
    assert!(!buf.is_empty());

    buf.reset();
    assert_eq!((buf.tail(), buf.head_tail(), buf.row_num()), (0, 0, 0));
    assert!(!buf.has_header());
    assert!(buf.is_empty());
    assert!(buf.as_bytes().is_empty());
    assert_eq!(buf.capacity(), 64);
}

#[test]
fn write_row_num_needs_a_header() {
    let mut buf = PayloadBuffer::with_capacity(64);
    let err = buf.write_row_num().unwrap_err();
    assert!(matches!(err, WireError::MalformedMessage { message_type: "payload", .. }));
}

#[test]
fn write_row_num_stamps_count_and_data_length() {
    let mut buf = PayloadBuffer::with_capacity(80);
    buf.head_tail = 50;
    buf.tail = 54 + 12;
    buf.row_num = 2;
    buf.write_row_num().unwrap();

    let bytes = buf.as_bytes();
    assert_eq!(&bytes[ROW_NUM_OFFSET..ROW_NUM_OFFSET + 4], &2_u32.to_le_bytes());
    assert_eq!(&bytes[50..54], &12_u32.to_le_bytes());
}

#[test]
fn header_fields_land_at_their_offsets() {
    let header = PayloadHeader {
        osn_id: 0x0102_0304_0506_0708,
        range_group_id: 7,
        payload_version: 1,
        db_id: 55,
        table_id: 0xAABB,
        ts_version: 9,
    };
    let mut head = [0xFFu8; HEAD_SIZE];
    header.write_into(&mut head);

    assert_eq!(&head[..8], &0x0102_0304_0506_0708_u64.to_le_bytes());
    // upper half of the osn slot is cleared
    assert_eq!(&head[8..16], &[0; 8]);
    assert_eq!(&head[16..18], &7_u16.to_le_bytes());
    assert_eq!(&head[22..26], &55_u32.to_le_bytes());
    assert_eq!(&head[26..34], &0xAABB_u64.to_le_bytes());
    // row count and row type are not part of the identity
    assert_eq!(&head[38..], &[0xFF; 5]);

    assert_eq!(PayloadHeader::read_from(&head).unwrap(), header);
    assert!(PayloadHeader::read_from(&head[..HEAD_SIZE - 1]).is_err());
}

#[test]
fn row_type_values() {
    assert_eq!(RowType::try_from(0).unwrap(), RowType::BothTagAndData);
    assert_eq!(RowType::try_from(1).unwrap(), RowType::OnlyData);
    assert_eq!(RowType::try_from(2).unwrap(), RowType::OnlyTag);
    assert!(RowType::try_from(3).is_err());
}
