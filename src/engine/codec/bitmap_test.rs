use super::bitmap::NullBitmap;

#[test]
fn size_for_rounds_up_to_whole_bytes() {
    assert_eq!(NullBitmap::size_for(0), 0);
    assert_eq!(NullBitmap::size_for(1), 1);
    assert_eq!(NullBitmap::size_for(8), 1);
    assert_eq!(NullBitmap::size_for(9), 2);
    assert_eq!(NullBitmap::size_for(16), 2);
    assert_eq!(NullBitmap::size_for(4096), 512);
}

#[test]
fn set_bit_is_lsb_first() {
    let mut bitmap = vec![0u8; 2];

    NullBitmap::set_bit(&mut bitmap, 0);
    assert_eq!(bitmap, vec![0b0000_0001, 0]);

    NullBitmap::set_bit(&mut bitmap, 7);
    assert_eq!(bitmap, vec![0b1000_0001, 0]);

    NullBitmap::set_bit(&mut bitmap, 8);
    assert_eq!(bitmap, vec![0b1000_0001, 0b0000_0001]);
}

#[test]
fn is_null_reads_back_only_set_bits() {
    let mut bitmap = vec![0u8; 2];
    for i in [1, 5, 9, 15] {
        NullBitmap::set_bit(&mut bitmap, i);
    }

    for i in 0..16 {
        let expected = matches!(i, 1 | 5 | 9 | 15);
        assert_eq!(NullBitmap::is_null(&bitmap, i), expected, "bit {i}");
    }
}
