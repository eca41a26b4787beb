use crate::engine::codec::column_type::oid;
use crate::test_helpers::factory::Factory;

#[test]
fn default_layout_is_the_cpu_table() {
    let layout = Factory::layout().create();
    assert_eq!(layout.column_count(), 6);
    assert_eq!(layout.tag_index(), 3);
    assert_eq!(layout.primary_tags(), &[3]);
    assert_eq!(layout.ptag_len(), 16);
}

#[test]
fn builder_overrides_apply() {
    let factory = Factory::layout()
        .with_columns(&[(oid::INT8, 8), (oid::BPCHAR, 10), (oid::INT2, 2)])
        .with_tag_index(1)
        .with_primary_tags(&[1, 2]);
    let desc = factory.description();
    assert_eq!(desc.oids, vec![oid::INT8, oid::BPCHAR, oid::INT2]);
    assert_eq!(desc.storage_lens, vec![8, 10, 2]);
    assert_eq!(desc.primary_tag_ids, vec![1, 2]);

    let layout = factory.create();
    assert_eq!(layout.ptag_len(), 12);
    assert_eq!(layout.row_size(), 8);
}
