use std::io::Cursor;

use roottools::writer::object::TObjString;
use roottools::writer::reader::{self, ParsedHeader};
use roottools::writer::Writer;

use test_log::test;

fn new_writer() -> Writer<Cursor<Vec<u8>>> {
    Writer::create("test.root", Cursor::new(Vec::new())).unwrap()
}

/// The directory record always sits immediately after the begin-key and its name payload.
fn directory_offset(storage: &mut Cursor<Vec<u8>>, header: &ParsedHeader) -> u64 {
    let begin_key = reader::read_key(storage, header.f_begin as u64).unwrap();
    header.f_begin as u64 + begin_key.f_nbytes as u64
}

fn seek_keys(storage: &mut Cursor<Vec<u8>>, header: &ParsedHeader) -> u64 {
    let dir = directory_offset(storage, header);
    reader::read_directory_seek_keys(storage, dir).unwrap()
}

#[test]
fn empty_file_has_zero_keys() {
    let writer = new_writer();
    assert_eq!(writer.len(), 0);
    assert!(writer.is_empty());

    let mut storage = writer.into_inner();
    let header = reader::read_header(&mut storage).unwrap();
    let seek_keys = seek_keys(&mut storage, &header);
    assert_eq!(reader::read_nkeys(&mut storage, seek_keys).unwrap(), 0);
    assert!(reader::read_string_keys(&mut storage, seek_keys).unwrap().is_empty());
}

#[test]
fn single_insert_round_trips() {
    let mut writer = new_writer();
    writer.insert("greeting", &TObjString::new("hello")).unwrap();
    assert_eq!(writer.len(), 1);

    let mut storage = writer.into_inner();
    let header = reader::read_header(&mut storage).unwrap();

    let begin_key = reader::read_key(&mut storage, header.f_begin as u64).unwrap();
    assert_eq!(begin_key.class_name, "TFile");

    let streamer_key = reader::read_key(&mut storage, header.f_seek_info).unwrap();
    assert_eq!(streamer_key.class_name, "TList");
    assert_eq!(streamer_key.title, "StreamerInfo");

    let seek_keys = seek_keys(&mut storage, &header);
    let keys = reader::read_string_keys(&mut storage, seek_keys).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].object_name, "greeting");

    let junk_key = reader::read_key(&mut storage, keys[0].f_seek_key).unwrap();
    assert_eq!(junk_key.object_name, "greeting");
    let value = reader::read_object_string(&mut storage, &junk_key).unwrap();
    assert_eq!(value, "hello");
}

#[test]
fn three_hundred_inserts_keep_offsets_consistent() {
    let mut writer = new_writer();
    for i in 0..300 {
        writer.insert(&format!("k{i}"), &TObjString::new("x")).unwrap();
    }
    assert_eq!(writer.len(), 300);

    let mut storage = writer.into_inner();
    let header = reader::read_header(&mut storage).unwrap();

    let seek_keys = seek_keys(&mut storage, &header);
    let keys = reader::read_string_keys(&mut storage, seek_keys).unwrap();
    assert_eq!(keys.len(), 300);
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(key.object_name, format!("k{i}"));
    }
}

#[test]
fn many_inserts_trigger_relocation() {
    let mut writer = new_writer();
    for i in 0..1000 {
        writer
            .insert(&format!("key{i}"), &TObjString::new(format!("value number {i}")))
            .unwrap();
    }
    assert_eq!(writer.len(), 1000);

    let mut storage = writer.into_inner();
    let header = reader::read_header(&mut storage).unwrap();

    // fEND must cover every byte written and never have shrunk below fSeekFree.
    assert!(header.f_end >= header.f_seek_free);
    assert!(header.f_seek_info > 0);

    let begin_key = reader::read_key(&mut storage, header.f_begin as u64).unwrap();
    assert_eq!(begin_key.f_nbytes, begin_key.f_keylen as i32 + begin_key.f_objlen);

    let seek_keys = seek_keys(&mut storage, &header);
    let keys = reader::read_string_keys(&mut storage, seek_keys).unwrap();
    assert_eq!(keys.len(), 1000);

    let last_key = reader::read_key(&mut storage, keys[999].f_seek_key).unwrap();
    let value = reader::read_object_string(&mut storage, &last_key).unwrap();
    assert_eq!(value, "value number 999");
}

/// Relocation safety: any sequence of inserts with payloads up to 400 bytes must leave the file
/// readable regardless of how many streamer/key-list relocations fired along the way.
fn check_relocation_safety(count: usize) {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    let mut writer = new_writer();
    let mut expected = Vec::with_capacity(count);
    for i in 0..count {
        let len = rng.gen_range(0..=400);
        let value: String = (0..len).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect();
        let name = format!("obj{i}");
        writer.insert(&name, &TObjString::new(value.clone())).unwrap();
        expected.push((name, value));
    }
    assert_eq!(writer.len() as usize, count);

    let mut storage = writer.into_inner();
    let header = reader::read_header(&mut storage).unwrap();
    assert!(header.f_end >= header.f_seek_free);

    let seek_keys = seek_keys(&mut storage, &header);
    let keys = reader::read_string_keys(&mut storage, seek_keys).unwrap();
    assert_eq!(keys.len(), count);

    for ((name, value), key) in expected.iter().zip(keys.iter()) {
        assert_eq!(&key.object_name, name);
        let junk_key = reader::read_key(&mut storage, key.f_seek_key).unwrap();
        assert_eq!(reader::read_object_string(&mut storage, &junk_key).unwrap(), *value);
    }
}

#[test]
fn relocation_safety_across_sizes() {
    for count in [0, 1, 2, 10, 1000] {
        check_relocation_safety(count);
    }
}
