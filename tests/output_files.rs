use std::io::ErrorKind;

use chime::sink::Wav;
use chime::{write_midi_dump, Session, Sink};

#[test]
fn one_second_wav_has_exact_size_and_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scale.wav");

    // one second of 44100 Hz stereo, written in two half-second chunks
    let mut wav = Wav::create(&path, 44100).unwrap();
    let chunk = vec![0x7Fu8; 22050 * 4];
    wav.write(&chunk).unwrap();
    wav.write(&chunk).unwrap();
    wav.close().unwrap();

    let data = std::fs::read(&path).unwrap();
    assert_eq!(data.len(), 44 + 4 * 44100);

    let riff = u32::from_le_bytes(data[4..8].try_into().unwrap());
    let size = u32::from_le_bytes(data[40..44].try_into().unwrap());
    assert_eq!(riff as usize, data.len() - 8);
    assert_eq!(size as usize, data.len() - 44);
    assert_eq!(u32::from_le_bytes(data[24..28].try_into().unwrap()), 44100);
    assert_eq!(u32::from_le_bytes(data[28..32].try_into().unwrap()), 44100 * 4);
}

#[test]
fn wav_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("present.wav");
    std::fs::write(&path, b"do not touch").unwrap();

    let err = Wav::create(&path, 44100).err().expect("create must fail");
    let io = err
        .downcast_ref::<std::io::Error>()
        .expect("io error underneath");
    assert_eq!(io.kind(), ErrorKind::AlreadyExists);

    // the existing file is untouched
    assert_eq!(std::fs::read(&path).unwrap(), b"do not touch");
}

#[test]
fn midi_dump_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.mid");

    write_midi_dump(&path, &chime::scale::TEST_MIDI).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), &chime::scale::TEST_MIDI[..]);
}

#[test]
fn midi_dump_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.mid");
    std::fs::write(&path, b"original").unwrap();

    let err = write_midi_dump(&path, b"replacement").err().expect("dump must fail");
    let io = err
        .downcast_ref::<std::io::Error>()
        .expect("io error underneath");
    assert_eq!(io.kind(), ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read(&path).unwrap(), b"original");
}

#[test]
fn wav_sink_through_a_player_session() {
    use chime::{scale::ScaleSession, Player};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test-scale.wav");

    let rate = 11025;
    let session = Box::new(ScaleSession::new(rate, 100));
    let total = session.info().approx_total_samples;
    let sink = Wav::create(&path, rate).unwrap();
    let mut player = Player::new(session, sink, rate);
    player.run().unwrap();

    let data = std::fs::read(&path).unwrap();
    // all rendered frames plus the trailing silent drain chunk
    assert_eq!(data.len(), 44 + total as usize * 4 + chime::CHUNK);
    let riff = u32::from_le_bytes(data[4..8].try_into().unwrap());
    assert_eq!(riff as usize, data.len() - 8);
}
