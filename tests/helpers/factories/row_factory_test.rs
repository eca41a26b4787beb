use crate::engine::codec::column_type::oid;
use crate::test_helpers::factory::{Factory, OwnedCell};

#[test]
fn values_fit_their_columns() {
    let oids = [oid::INT2, oid::INT4, oid::FLOAT4, oid::TIMESTAMPTZ, oid::VARCHAR];
    let rows = Factory::rows(&oids).with_max_text(5).create_list(200);
    assert_eq!(rows.len(), 200);
    for row in &rows {
        assert_eq!(row.len(), oids.len());
        match &row[0] {
            OwnedCell::Int(v) => assert!(i16::try_from(*v).is_ok()),
            other => panic!("int2 got {other:?}"),
        }
        match &row[2] {
            OwnedCell::Float(v) => assert_eq!((*v as f32) as f64, *v),
            other => panic!("float4 got {other:?}"),
        }
        match &row[3] {
            OwnedCell::Timestamp(v) => assert_eq!(v % 1_000, 0),
            other => panic!("timestamp got {other:?}"),
        }
        match &row[4] {
            OwnedCell::Bytes(b) => assert!(b.len() <= 5 && !b.contains(&0)),
            other => panic!("varchar got {other:?}"),
        }
    }
}

#[test]
fn pinned_values_and_nulls() {
    let rows = Factory::rows(&[oid::INT8, oid::TEXT])
        .with_null_ratio(1.0)
        .with_value(1, OwnedCell::Bytes(b"host".to_vec()))
        .create_list(10);
    for row in &rows {
        assert_eq!(row[0], OwnedCell::Null);
        assert_eq!(row[1], OwnedCell::Bytes(b"host".to_vec()));
    }

    let borrowed = OwnedCell::borrow_rows(&rows);
    assert!(borrowed[0][0].is_null());
}
