use std::io::Write;

use umi_dedup_suite::options::DemuxOptions;

const SHEET: &str = "[Data]\nSample_ID,Sample_Name,index,index2,Lane\nS1,SampleA,ACGT,AAAA,1\nS2,SampleB,TGCA,TTTT,1\n";

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

fn demux_opts(input: std::path::PathBuf, sample_sheet: std::path::PathBuf, output: String) -> DemuxOptions {
    DemuxOptions {
        input,
        sample_sheet,
        output,
        max_errors: 1,
        format_umi: false,
        tag_umi: false,
        lane: vec![],
        threads: 2,
        verbose: 0,
    }
}

#[test]
fn s6_demux_routes_exact_fuzzy_and_undetermined_reads_to_the_right_files() {
    let dir = tempfile::tempdir().unwrap();

    let fastq = "@INST:RUN:FC:1:TILE:1:1:ACGT+AAAA\n\
ACGTACGTAC\n\
+\n\
IIIIIIIIII\n\
@INST:RUN:FC:1:TILE:1:2:ACGA+AAAA\n\
TTTTTTTTTT\n\
+\n\
IIIIIIIIII\n\
@INST:RUN:FC:1:TILE:1:3:GGGG+AAAA\n\
CCCCCCCCCC\n\
+\n\
IIIIIIIIII\n";
    let input = write_file(dir.path(), "in.fastq", fastq);
    let sample_sheet = write_file(dir.path(), "sheet.csv", SHEET);

    let pattern = dir.path().join("out_%l_%i_%s.fastq").to_str().unwrap().to_string();
    umi_dedup_suite::demultiplex::run_demultiplex(&demux_opts(input, sample_sheet, pattern)).unwrap();

    let sample_a = std::fs::read_to_string(dir.path().join("out_001_S1_SampleA.fastq")).unwrap();
    let undetermined = std::fs::read_to_string(dir.path().join("out_001_0_Undetermined.fastq")).unwrap();

    assert_eq!(sample_a.matches("@INST").count(), 2, "exact and 1-mismatch reads both route to sample A");
    assert!(sample_a.contains(":1:ACGT+AAAA"));
    assert!(sample_a.contains(":1:ACGA+AAAA"));
    assert_eq!(undetermined.matches("@INST").count(), 1);
    assert!(undetermined.contains(":1:GGGG+AAAA"));

    assert!(!std::path::Path::new(&dir.path().join("out_001_S2_SampleB.fastq")).exists());
}

#[test]
fn demux_rejects_sample_sheet_with_ambiguous_indices() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = "[Data]\nSample_ID,Sample_Name,index,index2,Lane\nS1,A,ACGT,AAAA,1\nS2,B,ACGA,AAAA,1\n";
    let sample_sheet = write_file(dir.path(), "sheet.csv", sheet);
    let input = write_file(dir.path(), "in.fastq", "@x:y:z:1:a:ACGT+AAAA\nAC\n+\nII\n");

    let pattern = dir.path().join("out_%l_%i_%s.fastq").to_str().unwrap().to_string();
    let result = umi_dedup_suite::demultiplex::run_demultiplex(&demux_opts(input, sample_sheet, pattern));
    assert!(result.is_err());
}

#[test]
fn demux_rejects_unrecognized_input_extension() {
    let dir = tempfile::tempdir().unwrap();
    let sample_sheet = write_file(dir.path(), "sheet.csv", SHEET);
    let input = write_file(dir.path(), "in.txt", "not a fastq");

    let pattern = dir.path().join("out_%l_%i_%s.fastq").to_str().unwrap().to_string();
    let result = umi_dedup_suite::demultiplex::run_demultiplex(&demux_opts(input, sample_sheet, pattern));
    assert!(result.is_err());
}
