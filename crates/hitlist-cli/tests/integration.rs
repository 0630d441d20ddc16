use std::path::{Path, PathBuf};

use hitlist_cli::input::Input;
use hitlist_cli::runner::Runner;
use hitlist_core::Tool;

fn fixture(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests")
        .join(name)
        .display()
        .to_string()
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn integration() -> anyhow::Result<()> {
    let out: PathBuf = std::env::temp_dir().join(format!("hitlist-integration-{}", std::process::id()));
    std::fs::create_dir_all(&out)?;

    let config = serde_json::json!({
        "input_paths": [fixture("QC_Shew_msgfplus.tsv"), fixture("Intact_toppic.tsv")],
        "output_directory": out.display().to_string(),
        "fasta": fixture("proteins.fasta"),
        "msgf_parameter_file": fixture("msgf_mods.txt"),
    });
    let config_path = out.join("hitlist.json");
    std::fs::write(&config_path, serde_json::to_vec_pretty(&config)?)?;

    let search = Input::load(config_path.display().to_string())?.build()?;
    let runner = Runner::new(search)?;
    assert_eq!(runner.catalog().len(), 5);
    let search = runner.run()?;

    assert_eq!(search.files.len(), 2);

    let msgf = &search.files[0];
    assert_eq!(msgf.tool, Some(Tool::MsgfPlus));
    assert!(!msgf.success, "the malformed row is reported");
    assert_eq!(msgf.rejected_rows, 1);
    assert!(msgf.message.starts_with("line 4:"), "{}", msgf.message);
    assert_eq!(msgf.results, 6);
    assert_eq!(msgf.numeric_mod_errors, 1);
    // both halves of the merged spectrum are kept in the synopsis
    assert_eq!(msgf.synopsis, 4);
    assert_eq!(msgf.first_hits, 4);

    let syn = read_lines(&out.join("QC_Shew_msgfplus_syn.txt"));
    assert_eq!(syn.len(), 5);
    let header = syn[0].split('\t').collect::<Vec<_>>();
    assert_eq!(header[0], "ResultID");
    assert_eq!(header[14], "MSGFDB_SpecEValue");
    assert_eq!(header.len(), 20);
    let first = syn[1].split('\t').collect::<Vec<_>>();
    assert_eq!(first[0], "1");
    assert_eq!(first[9], "K.LQVPAGK#ANPSPPIGPALGQR.G");
    assert_eq!(first[15], "1");
    let second = syn[2].split('\t').collect::<Vec<_>>();
    assert_eq!((first[1], second[1]), ("100", "101"));
    assert_eq!(second[9], first[9]);
    assert!(syn.iter().any(|l| l.contains("R.M*PEPCTIDEK.A\tP1")));
    assert!(syn.iter().any(|l| l.contains("R.M*PEPCTIDEK.A\tP2")));

    let fht = read_lines(&out.join("QC_Shew_msgfplus_fht.txt"));
    assert_eq!(fht.len(), 5);
    // equal scores: the protein listed first in the FASTA file wins
    assert!(fht.iter().any(|l| l.contains("R.M*PEPCTIDEK.A\tP1")));
    assert!(!fht.iter().any(|l| l.contains("\tP2\t")));
    assert!(fht.iter().any(|l| l.contains("K.PEP+123.456TIDE.R")));

    let groups = read_lines(&out.join("QC_Shew_msgfplus_ScanGroupInfo.txt"));
    assert_eq!(groups[0], "Scan_Group_ID\tCharge\tScan");
    assert_eq!(&groups[1..3], &["1\t2\t100", "1\t2\t101"]);

    let mods = read_lines(&out.join("QC_Shew_msgfplus_ModSummary.txt"));
    assert!(mods.iter().any(|l| l.starts_with("#\t") && l.contains("Methyl")));
    assert!(mods.iter().any(|l| l.starts_with("*\t") && l.contains("Oxidation")));
    assert!(!mods.iter().any(|l| l.contains("Phospho")));

    let toppic = &search.files[1];
    assert_eq!(toppic.tool, Some(Tool::TopPic));
    assert!(toppic.success, "{}", toppic.message);
    assert_eq!(toppic.results, 3);
    assert_eq!(toppic.synopsis, 1);
    assert_eq!(toppic.first_hits, 3);

    let syn = read_lines(&out.join("Intact_toppic_syn.txt"));
    assert_eq!(syn.len(), 2);
    let row = syn[1].split('\t').collect::<Vec<_>>();
    assert_eq!(row[1], "210");
    assert_eq!(row[7], "-0.50000");
    assert_eq!(row[10], "M.A$SPEK#TIDE.-");
    assert_eq!(row[14], "sp|P1|ONE_HUMAN");
    assert!(out.join("Intact_toppic_ScanGroupInfo.txt").exists());

    assert!(out.join("results.json").exists());
    assert_eq!(search.output_paths.len(), 9);

    std::fs::remove_dir_all(&out)?;
    Ok(())
}
