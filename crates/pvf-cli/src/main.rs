use std::error::Error;

use clap::{ArgAction, Parser, Subcommand};
use commands::{
    collate::{self, CollateArgs},
    critical_mf::{self, CriticalMfArgs},
    extrapolate::{self, ExtrapolateArgs},
    fit_beta::{self, FitBetaArgs},
    mpcac::{self, MpcacArgs},
    phasediagram::{self, PhaseDiagramArgs},
    plots::{self, FitPlotArgs, VolumePlotArgs},
};

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(
    name = "pvf",
    about = "Gradient-flow and spectroscopy analyses with Pauli-Villars fields"
)]
struct Cli {
    /// Raise log verbosity; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// PCAC mass of one ensemble from its meson correlators.
    Mpcac(MpcacArgs),
    /// Critical bare mass from a set of PCAC masses.
    CriticalMf(CriticalMfArgs),
    /// Tabulate critical mass results as CSV.
    CollateCriticalMf(CollateArgs),
    /// Extrapolate the flow coupling and beta function to infinite volume.
    ExtrapolateInfiniteVolume(ExtrapolateArgs),
    /// Interpolate the infinite-volume beta function in g².
    FitBeta(FitBetaArgs),
    /// Plot beta function fits against perturbation theory.
    PlotBeta(FitPlotArgs),
    /// Plot fixed-point coupling and anomalous dimension scans.
    PlotFixedPointScan(FitPlotArgs),
    /// Plot the coupling and plaquette against the bare coupling.
    PlotG2Beta0(FitPlotArgs),
    /// Plot the infinite-volume extrapolations.
    PlotInfiniteVolume(VolumePlotArgs),
    /// Scan HMC logs for the plaquette phase diagram.
    Phasediagram(PhaseDiagramArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    match cli.command {
        Command::Mpcac(args) => mpcac::run(&args),
        Command::CriticalMf(args) => critical_mf::run(&args),
        Command::CollateCriticalMf(args) => collate::run(&args),
        Command::ExtrapolateInfiniteVolume(args) => extrapolate::run(&args),
        Command::FitBeta(args) => fit_beta::run(&args),
        Command::PlotBeta(args) => plots::run_beta(&args),
        Command::PlotFixedPointScan(args) => plots::run_fixed_point(&args),
        Command::PlotG2Beta0(args) => plots::run_g2_beta0(&args),
        Command::PlotInfiniteVolume(args) => plots::run_infinite_volume(&args),
        Command::Phasediagram(args) => phasediagram::run(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pauli_villars_options_keep_their_case() {
        let cli = Cli::try_parse_from([
            "pvf",
            "extrapolate-infinite-volume",
            "a",
            "b",
            "--time",
            "4.5",
            "--Npv",
            "5",
            "--mpv",
            "1.0",
        ])
        .expect("parse");
        let Command::ExtrapolateInfiniteVolume(args) = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.npv, Some(5));
        assert_eq!(args.time, 4.5);
        assert_eq!(args.operator, "sym");
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["pvf", "-vv", "fit-beta", "x.json"]).expect("parse");
        assert_eq!(cli.verbose, 2);
        assert_eq!(logging::default_level(cli.verbose), "trace");
    }
}
