//! Rampline CLI — audible demo player for ramp glides.
//!
//! Plays a sine test tone whose frequency is driven by a [`Ramp`], gliding
//! back and forth between two frequencies through a selectable curve. Each
//! completed glide retargets the ramp mid-stream via `merge`, so the tone
//! never snaps.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rampline_core::curves::CurveKind;
use rampline_core::dsp::{clamp, db_to_lin};
use rampline_core::ramp::{Instruction, Ramp};
use std::error::Error;
use std::time::Duration;

/// Samples rendered per ramp block inside the audio callback.
const BLOCK: usize = 64;

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    list_curves: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<u64>,
    curve: Option<String>,
    from_hz: Option<f32>,
    to_hz: Option<f32>,
    glide_ms: Option<f32>,
    gain_db: Option<f32>,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if s == "--list-curves"  { a.list_curves = true;  continue; }
        if let Some(rest) = s.strip_prefix("--device=")      { a.device_name = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--channels=")    { a.channels    = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec= rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--curve=")       { a.curve       = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--from=")        { a.from_hz     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--to=")          { a.to_hz      = rest.parse().ok();       continue; }
        if let Some(rest) = s.strip_prefix("--glide-ms=")    { a.glide_ms    = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--gain-db=")     { a.gain_db     = rest.parse().ok();      continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

fn list_output_devices() -> Result<(), Box<dyn Error>> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn list_curves() {
    println!("Available curves:");
    for kind in CurveKind::ALL {
        println!("- {}", kind.name());
    }
}

fn pick_device(args: &Args) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if let Some(name) = &args.device_name {
        for d in host.output_devices()? {
            if d.name()? == *name { return Ok(d); }
        }
        return Err(format!("requested device not found: {name}").into());
    }
    host.default_output_device()
        .ok_or_else(|| "no default output device".into())
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Pick a SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch     = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => (i64::from(ch) - i64::from(c)).unsigned_abs(), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) => if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) },
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map(|(s, _)| *s).map_or(true, |s| score < s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| "no supported output configs".to_string())?;

    // Choose a concrete sample rate and convert the range into a concrete config.
    let pick_sr = match req_sr {
        Some(sr) => {
            let lo = range.min_sample_rate().0;
            let hi = range.max_sample_rate().0;
            cpal::SampleRate(sr.clamp(lo, hi))
        }
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

/// Sine tone whose frequency follows a ping-ponging ramp glide.
struct GlideVoice {
    ramp: Ramp,
    curve: CurveKind,
    lo_hz: f32,
    hi_hz: f32,
    glide_ms: f32,
    rising: bool,
    block: [f32; BLOCK],
    idx: usize,
    phase: f32,
    sr: f32,
}

impl GlideVoice {
    fn new(lo_hz: f32, hi_hz: f32, glide_ms: f32, curve: CurveKind, sr: f32) -> Self {
        let mut ramp = Ramp::new(lo_hz);
        ramp.merge(Instruction::glide_to(hi_hz, glide_ms, curve), sr);
        GlideVoice {
            ramp,
            curve,
            lo_hz,
            hi_hz,
            glide_ms,
            rising: true,
            block: [lo_hz; BLOCK],
            idx: BLOCK, // force a refill on the first sample
            phase: 0.0,
            sr,
        }
    }

    fn refill(&mut self) {
        let still_gliding = self.ramp.advance(&mut self.block, None);
        self.idx = 0;
        if !still_gliding {
            self.rising = !self.rising;
            let target = if self.rising { self.hi_hz } else { self.lo_hz };
            self.ramp
                .merge(Instruction::glide_to(target, self.glide_ms, self.curve), self.sr);
        }
    }

    /// Next mono sample in [-1, 1].
    fn next(&mut self) -> f32 {
        if self.idx >= BLOCK {
            self.refill();
        }
        let freq = self.block[self.idx];
        self.idx += 1;

        self.phase += freq / self.sr;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        (core::f32::consts::TAU * self.phase).sin()
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut voice: GlideVoice,
    gain: f32,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = cfg.channels as usize;

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for frame in output.chunks_mut(channels) {
                let s = clamp(voice.next() * gain, -1.0, 1.0);
                let v: T = T::from_sample(s);
                for ch in frame.iter_mut() { *ch = v; }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();

    if args.list_devices {
        list_output_devices()?;
        return Ok(());
    }
    if args.list_curves {
        list_curves();
        return Ok(());
    }

    println!("rampline-cli — ramp glide demo player\n");

    let curve_name = args.curve.as_deref().unwrap_or("cosine");
    let curve = CurveKind::from_name(curve_name)
        .ok_or_else(|| format!("unknown curve: {curve_name} (try --list-curves)"))?;

    let device  = pick_device(&args)?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();

    if let Some(sr) = args.sample_rate { cfg.sample_rate = cpal::SampleRate(sr); }
    if let Some(ch) = args.channels    { cfg.channels    = ch; }

    let sr_f32   = cfg.sample_rate.0 as f32;
    let lo_hz    = args.from_hz.unwrap_or(220.0);
    let hi_hz    = args.to_hz.unwrap_or(880.0);
    let glide_ms = args.glide_ms.unwrap_or(1500.0);
    let gain     = db_to_lin(args.gain_db.unwrap_or(-12.0));

    let voice = GlideVoice::new(lo_hz, hi_hz, glide_ms, curve, sr_f32);

    println!("Using device: {}", device.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", cfg, sample_format);
    println!(
        "Glide: {lo_hz} Hz ↔ {hi_hz} Hz over {glide_ms} ms | Curve: {} | Gain: {:.2}",
        curve.name(),
        gain
    );
    if let Some(d) = args.duration_sec { println!("Auto-stop after {d} seconds"); }
    println!("Press Ctrl+C to stop…\n");

    let err_fn = |e: cpal::StreamError| eprintln!("[cpal] stream error: {e}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, voice, gain, err_fn)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, voice, gain, err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, voice, gain, err_fn)?,
        other => return Err(format!("unsupported device sample format: {other:?}").into()),
    };

    stream.play()?;

    if let Some(d) = args.duration_sec {
        std::thread::sleep(Duration::from_secs(d));
        return Ok(());
    }

    loop { std::thread::sleep(Duration::from_millis(500)); }
}
