use std::time::Duration;

use clap::clap_app;

use chime::engine::mixer;
use chime::{Output, Player, Session};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let matches = clap_app!(
        chime =>
            (about: "plays MIDI-family files through a software synthesizer")
            (@arg RATE: -r --rate +takes_value "output sample rate in Hz, 11025-65535 (default 44100)")
            (@arg VOLUME: -m --volume +takes_value "master volume, 0-127 (default 100)")
            (@arg CONFIG: -c --config +takes_value "synthesizer patch configuration file")
            (@arg OUTPUT: -o --output +takes_value "output destination: play, null, or wav:PATH")
            (@arg CONVERT: -x --convert +takes_value "convert the input to plain midi, write to this path, and exit")
            (@arg TEST: -t --test "play the built-in test scale")
            (@arg REVERB: -b --reverb "enable reverb")
            (@arg RESAMPLE: -e --("enhanced-resampling") "enable enhanced resampling")
            (@arg LOGVOL: -l --("log-volume") "use logarithmic volume scaling")
            (@arg WHOLETEMPO: -w --("whole-tempo") "round tempo down to a whole number")
            (@arg ROUNDTEMPO: -u --("round-tempo") "round tempo to the nearest whole number")
            (@arg STRIPSILENCE: -s --("strip-silence") "strip leading silence")
            (@arg TEXTLYRIC: -g --("text-as-lyric") "treat text events as lyrics")
            (@arg SLEEP: -z --sleep +takes_value "sleep this many milliseconds between chunks")
            (@arg FILE: "midi/xmi file to play")
    )
    .get_matches();

    let rate = match matches.value_of("RATE") {
        Some(v) => v.parse::<u32>().map_err(|_| anyhow::anyhow!("bad sample rate {:?}", v))?,
        None => 44100,
    };
    anyhow::ensure!(
        (11025..=65535).contains(&rate),
        "sample rate {} out of range 11025..=65535",
        rate
    );
    let volume = match matches.value_of("VOLUME") {
        Some(v) => {
            let v = v.parse::<u16>().map_err(|_| anyhow::anyhow!("bad volume {:?}", v))?;
            anyhow::ensure!(v <= 127, "volume {} out of range 0..=127", v);
            v as u8
        }
        None => 100,
    };

    let mut options = 0u16;
    if matches.is_present("REVERB") {
        options |= mixer::REVERB;
    }
    if matches.is_present("RESAMPLE") {
        options |= mixer::ENHANCED_RESAMPLING;
    }
    if matches.is_present("LOGVOL") {
        options |= mixer::LOG_VOLUME;
    }
    if matches.is_present("WHOLETEMPO") {
        options |= mixer::WHOLE_TEMPO;
    }
    if matches.is_present("ROUNDTEMPO") {
        options |= mixer::ROUND_TEMPO;
    }
    if matches.is_present("STRIPSILENCE") {
        options |= mixer::STRIP_SILENCE;
    }
    if matches.is_present("TEXTLYRIC") {
        options |= mixer::TEXT_AS_LYRIC;
    }

    let test = matches.is_present("TEST");
    let file = matches.value_of("FILE");
    let config = matches.value_of("CONFIG").map(std::path::Path::new);

    // convert mode: single-shot dump, no streaming
    if let Some(dump) = matches.value_of("CONVERT") {
        let path = file.ok_or_else(|| anyhow::anyhow!("convert mode needs an input file"))?;
        let data = std::fs::read(path)?;
        let midi = convert(config, rate, &data)?;
        chime::write_midi_dump(dump, &midi)?;
        println!("wrote {}", dump);
        return Ok(());
    }

    anyhow::ensure!(test || file.is_some(), "nothing to play; pass a file or --test");

    let output = matches
        .value_of("OUTPUT")
        .map(Output::from_str)
        .transpose()?
        .unwrap_or(Output::System);
    let sink = output.to_sink(rate)?;

    let mut session = open_session(config, rate, volume, test, file)?;
    if options != 0 {
        session.set_options(options, options)?;
    }
    if let Some(path) = file {
        println!("Processing {}", path);
    }

    let progress = chime::progress::Console::new(&session.info(), rate);
    let mut player = Player::new(session, sink, rate).with_progress(Box::new(progress));
    if let Some(ms) = matches.value_of("SLEEP") {
        let ms = ms.parse::<u64>().map_err(|_| anyhow::anyhow!("bad sleep value {:?}", ms))?;
        player.yield_delay = Some(Duration::from_millis(ms));
    }

    // a failed write already printed its diagnostic; the session is over
    // but the process still shuts down normally
    if let Err(e) = player.run() {
        eprintln!("\nplayback ended early: {}", e);
    }
    eprintln!("\nok");
    Ok(())
}

#[cfg(feature = "wildmidi")]
fn open_session(
    config: Option<&std::path::Path>,
    rate: u32,
    volume: u8,
    test: bool,
    file: Option<&str>,
) -> anyhow::Result<Box<dyn Session>> {
    use chime::{Engine, WildMidi};

    let engine = WildMidi::init(config, rate, 0)?;
    engine.master_volume(volume)?;
    let session = match file {
        Some(path) if !test => engine.open_file(std::path::Path::new(path))?,
        _ => engine.open_bytes(&chime::scale::TEST_MIDI)?,
    };
    Ok(session)
}

#[cfg(not(feature = "wildmidi"))]
fn open_session(
    _config: Option<&std::path::Path>,
    rate: u32,
    volume: u8,
    test: bool,
    file: Option<&str>,
) -> anyhow::Result<Box<dyn Session>> {
    if !test && file.is_some() {
        anyhow::bail!("built without the wildmidi feature; only --test is available");
    }
    Ok(Box::new(chime::scale::ScaleSession::new(rate, volume)))
}

#[cfg(feature = "wildmidi")]
fn convert(config: Option<&std::path::Path>, rate: u32, data: &[u8]) -> anyhow::Result<Vec<u8>> {
    use chime::{Engine, WildMidi};
    let engine = WildMidi::init(config, rate, 0)?;
    engine.convert_to_midi(data)
}

#[cfg(not(feature = "wildmidi"))]
fn convert(_config: Option<&std::path::Path>, _rate: u32, _data: &[u8]) -> anyhow::Result<Vec<u8>> {
    anyhow::bail!("convert mode needs the wildmidi feature")
}
