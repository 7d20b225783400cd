use std::{
    cell::{Cell, RefCell},
    io::{Stdin, Write},
    rc::Rc,
    str::FromStr,
};

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use logger::LevelFilter;
use nix::sys::signal::Signal;
use sigstream::{
    DispatchTable, Pollable, Poller, RecordReport, SignalSource, StreamSource, SysError,
};

static LOG_LEVEL_ENV: &str = "SIGSTREAM_LOG_LEVEL";

fn main() -> anyhow::Result<()> {
    let matches = Command::new("sigstream-watch")
        .about("Print signals as they are read from a signal descriptor")
        .arg(
            Arg::new("signal")
                .short('s')
                .long("signal")
                .takes_value(true)
                .multiple_occurrences(true)
                .default_values(&["SIGCHLD", "SIGALRM"])
                .help("Signal to watch, by name or number"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .takes_value(true)
                .help("Deliver SIGALRM every <interval> seconds"),
        )
        .arg(Arg::new("json").long("json").help("Print records as JSON lines"))
        .arg(
            Arg::new("no-stdin")
                .long("no-stdin")
                .help("Do not echo standard input"),
        )
        .arg(Arg::new("v").multiple_occurrences(true).short('v'))
        .get_matches();

    let level = std::cmp::max(
        logger::level_from_env(LOG_LEVEL_ENV),
        verbosity(matches.occurrences_of("v")),
    );
    logger::init(level).map_err(|_| anyhow::anyhow!("failed to set log level"))?;

    watch(&matches)
}

fn verbosity(occurrences: u64) -> LevelFilter {
    match occurrences {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn parse_signal(s: &str) -> anyhow::Result<i32> {
    if let Ok(signo) = s.parse::<i32>() {
        return Ok(signo);
    }
    let name = s.to_uppercase();
    let name = if name.starts_with("SIG") {
        name
    } else {
        format!("SIG{}", name)
    };
    let signal = Signal::from_str(&name).with_context(|| format!("unknown signal {:?}", s))?;
    Ok(signal as i32)
}

fn signal_set(matches: &ArgMatches) -> anyhow::Result<Vec<i32>> {
    let mut signals = matches
        .values_of("signal")
        .into_iter()
        .flatten()
        .map(parse_signal)
        .collect::<anyhow::Result<Vec<_>>>()?;
    // always watch the signals that end the loop
    let mut wanted = vec![libc::SIGINT, libc::SIGTERM];
    if matches.is_present("interval") {
        wanted.push(libc::SIGALRM);
    }
    for signo in wanted {
        if !signals.contains(&signo) {
            signals.push(signo);
        }
    }
    Ok(signals)
}

fn arm_interval_timer(secs: libc::time_t) -> anyhow::Result<()> {
    let period = libc::timeval {
        tv_sec: secs,
        tv_usec: 0,
    };
    let timer = libc::itimerval {
        it_interval: period,
        it_value: period,
    };
    if unsafe { libc::setitimer(libc::ITIMER_REAL, &timer, std::ptr::null_mut()) } < 0 {
        return Err(SysError::from_nix_errno(nix::errno::Errno::last()))
            .context("setitimer failed");
    }
    logger::info!("SIGALRM every {}s", secs);
    Ok(())
}

fn watch(matches: &ArgMatches) -> anyhow::Result<()> {
    let signals = signal_set(matches)?;
    let json = matches.is_present("json");

    let source = sigstream::open_signal_source(&signals)
        .with_context(|| format!("failed to open signal source for {:?}", signals))?;
    let source = Rc::new(RefCell::new(source));

    // arm only after the signals are blocked
    if let Some(interval) = matches.value_of("interval") {
        let secs = interval
            .parse()
            .with_context(|| format!("invalid interval {:?}", interval))?;
        arm_interval_timer(secs)?;
    }

    let mut poller = Poller::new();
    let mut table = DispatchTable::new();
    let running = Rc::new(Cell::new(true));

    poller.add(&*source.borrow(), linux::POLL_READABLE_EVENTS)?;
    {
        let running = Rc::clone(&running);
        table.register_fn(&source, move |source: &mut SignalSource, _| {
            let info = source.read_one()?;
            let report = RecordReport::from(&info);
            let line = if json {
                serde_json::to_string(&report)
                    .map_err(|e| SysError::new_with_msg(libc::EINVAL, e.to_string()))?
            } else {
                report.to_string()
            };
            println!("{}", line);
            if info.signal_number() == libc::SIGINT as u32
                || info.signal_number() == libc::SIGTERM as u32
            {
                running.set(false);
            }
            Ok(())
        });
    }

    let stdin_done = Rc::new(Cell::new(false));
    let stdin = Rc::new(RefCell::new(StreamSource::new(std::io::stdin())));
    let stdin_fd = stdin.borrow().descriptor_id();
    if !matches.is_present("no-stdin") {
        poller.add(&*stdin.borrow(), linux::POLL_READABLE_EVENTS)?;
        let stdin_done = Rc::clone(&stdin_done);
        table.register_fn(&stdin, move |stdin: &mut StreamSource<Stdin>, events| {
            // hang up or error with nothing left to read
            if events & linux::POLL_ERROR_EVENTS != 0
                && events & linux::POLL_READABLE_EVENTS == 0
            {
                stdin_done.set(true);
                return Ok(());
            }
            let mut buf = [0; 1024];
            let n = stdin.read(&mut buf)?;
            if n == 0 {
                stdin_done.set(true);
                return Ok(());
            }
            let mut out = std::io::stdout();
            out.write_all(&buf[..n])?;
            out.flush()?;
            Ok(())
        });
    }

    logger::info!("watching {:?}", signals);
    while running.get() {
        let ready = poller.poll(-1).context("poll failed")?;
        table
            .dispatch_all(&ready)
            .context("failed to handle ready descriptor")?;
        if stdin_done.replace(false) {
            logger::debug!("stdin closed");
            poller.remove(stdin_fd);
            table.unregister(stdin_fd);
        }
    }

    source
        .borrow_mut()
        .close()
        .context("failed to close signal source")?;
    Ok(())
}
