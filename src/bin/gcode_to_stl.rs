// CLI driver: run the full toolpath-to-volume pipeline on one file.
//
// Usage: gcode_to_stl <input> <output.stl> [--rings N] [--stride K] [--field NAME]
//
// A `.json` input is read as a telemetry row array; anything else is treated
// as program text.

use std::process::ExitCode;

use beadmesh::{
    calibrate_trace, export, extrude_trace, BeadParams, Calibration, Feedstock, LevelOfDetail,
    ScalarField, TelemetryRow, TraceSource,
};

struct Args {
    input: String,
    output: String,
    lod: LevelOfDetail,
    field: ScalarField,
}

fn parse_args() -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut lod = LevelOfDetail::default();
    let mut field = ScalarField::default();

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--rings" => {
                let v = iter.next().ok_or("--rings needs a value")?;
                lod.ring_vertices = v.parse().map_err(|_| format!("bad ring count {:?}", v))?;
            }
            "--stride" => {
                let v = iter.next().ok_or("--stride needs a value")?;
                lod.stride = v.parse().map_err(|_| format!("bad stride {:?}", v))?;
            }
            "--field" => {
                let v = iter.next().ok_or("--field needs a value")?;
                field = match v.as_str() {
                    "time" => ScalarField::ElapsedTime,
                    "feed" => ScalarField::FeedVelocity,
                    "path" => ScalarField::PathVelocity,
                    "area" => ScalarField::BeadArea,
                    "thickness" => ScalarField::BeadThickness,
                    "width" => ScalarField::BeadWidth,
                    other => return Err(format!("unknown scalar field {:?}", other)),
                };
            }
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        return Err(
            "usage: gcode_to_stl <input> <output.stl> [--rings N] [--stride K] [--field NAME]"
                .to_string(),
        );
    }

    let mut positional = positional.into_iter();
    Ok(Args {
        input: positional.next().unwrap(),
        output: positional.next().unwrap(),
        lod,
        field,
    })
}

fn run(args: &Args) -> Result<(), String> {
    let text = std::fs::read_to_string(&args.input)
        .map_err(|e| format!("reading {}: {}", args.input, e))?;

    let source = if args.input.ends_with(".json") {
        let rows: Vec<TelemetryRow> =
            serde_json::from_str(&text).map_err(|e| format!("parsing telemetry: {}", e))?;
        TraceSource::Telemetry(rows)
    } else {
        TraceSource::Program(text)
    };

    let trace = source.into_trace().map_err(|e| e.to_string())?;
    println!("Trace: {} samples", trace.len());

    let calibrated = calibrate_trace(
        &trace,
        &Feedstock::default(),
        &BeadParams::default(),
        &Calibration::default(),
    )
    .map_err(|e| e.to_string())?;

    let mesh = extrude_trace(&calibrated, args.field, &args.lod)
        .map_err(|e| e.to_string())?
        .ok_or("trace produced no mesh (no usable segments)")?;

    println!(
        "Mesh: {} vertices, {} faces",
        mesh.num_vertices(),
        mesh.num_faces()
    );
    if let Some(bounds) = mesh.bounds() {
        println!(
            "Bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
    }

    export::write_stl_file(&mesh, &args.output).map_err(|e| e.to_string())?;
    println!("Wrote {}", args.output);

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}
