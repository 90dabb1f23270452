//! # CLI - n-gram anomaly detector front-end
//!
//! Batch tool around the [`engine`] crate. Input is line-oriented: each
//! line of the input file (or stdin) is one independent byte buffer.
//! Results go to the output file (or stdout); diagnostics go to stderr.
//!
//! ## Modes
//!
//! ```text
//! cli train   -i corpus.txt -o model        Train a model on the input
//! cli predict -b model -i input.txt         Anomaly score per line
//! cli predict -b good -g bad -i input.txt   2-class score per line
//! cli inspect -i corpus.txt                 new/uniq/total/len per line
//! cli inspect -b model -i corpus.txt        ... against a fixed model
//! ```
//!
//! ## Options
//!
//! ```text
//! -i <file>            input file            (default: stdin)
//! -o <file>            output file           (default: stdout; model path for train)
//! -b <file>            model file
//! -g <file>            second ("bad") model for 2-class prediction
//! -n <len>             n-gram length         (default: 3)
//! -d <delimiters>      delimiter spec, %HH escapes allowed -> token mode
//! --binary             bit n-grams instead of byte n-grams
//! -s <exponent>        filter size exponent  (default: 24, i.e. 2^24 bits)
//! --hash-set <name>    "simple" or "murmur"  (default: simple)
//! --batch <n>          lines per batch       (default: 128)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cli train -n 3 -i good.txt -o web.model
//! trained 1842 inputs (saturation 0.013%)
//! $ cli predict -b web.model -i traffic.txt -o scores.txt
//! ```

use anyhow::{bail, Context, Result};
use engine::inspect::{expected_error, saturation};
use engine::{
    BloomFilter, Detector, HashFamily, InspectPolicy, DEFAULT_FILTER_SIZE_EXP,
    DEFAULT_NGRAM_LENGTH,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

/// Lines processed per batch.
const DEFAULT_BATCH_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Train,
    Predict,
    Inspect,
}

#[derive(Debug)]
struct Options {
    mode: Mode,
    input: Option<String>,
    output: Option<String>,
    model: Option<String>,
    bad_model: Option<String>,
    ngram_length: usize,
    delimiter: String,
    binary: bool,
    size_exp: u32,
    family: HashFamily,
    batch_size: usize,
}

fn usage() -> &'static str {
    "usage: cli <train|predict|inspect> [-i input] [-o output] [-b model] \
     [-g bad-model] [-n length] [-d delimiters] [--binary] [-s size-exp] \
     [--hash-set simple|murmur] [--batch n]"
}

fn parse_args(args: &[String]) -> Result<Options> {
    let Some(mode_arg) = args.first() else {
        bail!("{}", usage());
    };
    let mode = match mode_arg.as_str() {
        "train" => Mode::Train,
        "predict" => Mode::Predict,
        "inspect" => Mode::Inspect,
        other => bail!("unknown mode '{}'\n{}", other, usage()),
    };

    let mut opts = Options {
        mode,
        input: None,
        output: None,
        model: None,
        bad_model: None,
        ngram_length: DEFAULT_NGRAM_LENGTH,
        delimiter: String::new(),
        binary: false,
        size_exp: DEFAULT_FILTER_SIZE_EXP,
        family: HashFamily::Simple,
        batch_size: DEFAULT_BATCH_SIZE,
    };

    let mut it = args[1..].iter();
    while let Some(flag) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .cloned()
                .with_context(|| format!("missing value for {}", name))
        };
        match flag.as_str() {
            "-i" => opts.input = Some(value("-i")?),
            "-o" => opts.output = Some(value("-o")?),
            "-b" => opts.model = Some(value("-b")?),
            "-g" => opts.bad_model = Some(value("-g")?),
            "-n" => {
                opts.ngram_length = value("-n")?
                    .parse()
                    .context("-n expects an unsigned integer")?
            }
            "-d" => opts.delimiter = value("-d")?,
            "--binary" => opts.binary = true,
            "-s" => {
                opts.size_exp = value("-s")?
                    .parse()
                    .context("-s expects an unsigned integer")?
            }
            "--hash-set" => {
                let name = value("--hash-set")?;
                opts.family = HashFamily::from_name(&name)
                    .with_context(|| format!("unknown hash set '{}'", name))?;
            }
            "--batch" => {
                opts.batch_size = value("--batch")?
                    .parse()
                    .context("--batch expects an unsigned integer")?;
                if opts.batch_size == 0 {
                    bail!("--batch must be nonzero");
                }
            }
            other => bail!("unknown option '{}'\n{}", other, usage()),
        }
    }
    if opts.binary && !opts.delimiter.is_empty() {
        bail!("--binary conflicts with -d: bit and token n-grams are mutually exclusive");
    }
    Ok(opts)
}

/// Builds a fresh detector from the command-line options.
fn detector_from_options(opts: &Options) -> Result<Detector> {
    let mut d = Detector::new();
    d.set_bloomfilter(opts.size_exp, opts.family)?;
    d.set_ngram_length(opts.ngram_length)?;
    d.use_binary_ngrams(opts.binary);
    d.set_delimiter(&opts.delimiter);
    Ok(d)
}

fn open_input(opts: &Options) -> Result<Box<dyn BufRead>> {
    Ok(match &opts.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open input '{}'", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn open_output(opts: &Options) -> Result<Box<dyn Write>> {
    Ok(match &opts.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create output '{}'", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Pulls lines from `r` in batches of `batch_size` and hands each batch
/// to `sink`. Lines are raw bytes with the trailing `\n` (and `\r`)
/// stripped; encoding is opaque to the detector.
fn for_each_batch<R, F>(r: &mut R, batch_size: usize, mut sink: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&[Vec<u8>]) -> Result<()>,
{
    let mut batch: Vec<Vec<u8>> = Vec::with_capacity(batch_size);
    loop {
        let mut line = Vec::new();
        let n = r.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        batch.push(line);
        if batch.len() == batch_size {
            sink(&batch)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        sink(&batch)?;
    }
    Ok(())
}

fn format_score(score: f64) -> String {
    if score.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.6}", score)
    }
}

fn run_train(opts: &Options) -> Result<()> {
    let Some(model_path) = opts.output.as_deref().or(opts.model.as_deref()) else {
        bail!("train needs a model path (-o or -b)");
    };

    let mut detector = detector_from_options(opts)?;
    let mut input = open_input(opts)?;

    let mut count = 0usize;
    for_each_batch(&mut input, opts.batch_size, |batch| {
        detector.train(batch)?;
        count += batch.len();
        Ok(())
    })?;

    detector.to_file(model_path)?;
    if let Some(bloom) = detector.bloom() {
        eprintln!(
            "trained {} inputs (saturation {:.3}%)",
            count,
            saturation(bloom) * 100.0
        );
    }
    Ok(())
}

fn run_predict(opts: &Options) -> Result<()> {
    let Some(model_path) = opts.model.as_deref() else {
        bail!("predict needs a model (-b)");
    };
    let detector = Detector::from_file(model_path, opts.binary)
        .with_context(|| format!("cannot load model '{}'", model_path))?;
    let bad = match opts.bad_model.as_deref() {
        Some(path) => Some(
            Detector::from_file(path, opts.binary)
                .with_context(|| format!("cannot load model '{}'", path))?,
        ),
        None => None,
    };

    let mut input = open_input(opts)?;
    let mut output = open_output(opts)?;

    for_each_batch(&mut input, opts.batch_size, |batch| {
        let scores = match &bad {
            Some(bad) => detector.predict_2class(bad, batch)?,
            None => detector.predict(batch)?,
        };
        for score in scores {
            writeln!(output, "{}", format_score(score))?;
        }
        Ok(())
    })?;
    output.flush()?;
    Ok(())
}

fn run_inspect(opts: &Options) -> Result<()> {
    // With an existing model the training filter stays read-only
    // (Freeze); starting fresh, inspected inputs extend it (Extend).
    let (mut detector, policy) = match opts.model.as_deref() {
        Some(path) => (
            Detector::from_file(path, opts.binary)
                .with_context(|| format!("cannot load model '{}'", path))?,
            InspectPolicy::Freeze,
        ),
        None => (detector_from_options(opts)?, InspectPolicy::Extend),
    };

    // auxiliary filter with the same shape as the model's
    let Some(bloom) = detector.bloom() else {
        bail!("model has no filter");
    };
    let mut aux = BloomFilter::new(bloom.bitsize())?;
    aux.set_hash_funcs(bloom.funcs())?;

    let mut input = open_input(opts)?;
    let mut output = open_output(opts)?;

    let mut unique_total = 0u64;
    for_each_batch(&mut input, opts.batch_size, |batch| {
        for line in batch {
            let stats = detector.inspect(&mut aux, line, policy)?;
            writeln!(
                output,
                "{}\t{}\t{}\t{}",
                stats.new,
                stats.uniq,
                stats.total,
                line.len()
            )?;
            unique_total += stats.new;
        }
        Ok(())
    })?;
    output.flush()?;

    if let Some(bloom) = detector.bloom() {
        eprintln!("Saturation: {:.3}%", saturation(bloom) * 100.0);
        eprintln!(
            "Expected error: {:.3}%",
            expected_error(bloom, unique_total) * 100.0
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = parse_args(&args)?;
    match opts.mode {
        Mode::Train => run_train(&opts),
        Mode::Predict => run_predict(&opts),
        Mode::Inspect => run_inspect(&opts),
    }
}
