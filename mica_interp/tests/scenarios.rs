//! End-to-end interpreter scenarios over literal IL sources

use mica_common::{CancelToken, RuntimeError};
use mica_interp::{Halt, Interpreter, Options, VecInput, VecOutput, VecTrace};
use mica_parser::parse;
use pretty_assertions::assert_eq;

fn run_program(source: &str, input: &[i64]) -> Result<Vec<i64>, RuntimeError> {
    let (cfg, _) = parse(source).expect("scenario source must parse");
    cfg.validate().expect("scenario source must validate");
    let mut interp = Interpreter::new(&cfg, Options::default(), CancelToken::new());
    let mut input = VecInput::of(input);
    let mut output = VecOutput::new();
    let halt = interp.run(&mut input, &mut output, None)?;
    assert_eq!(halt, Halt::Exited);
    Ok(output.as_i64s())
}

/// Quotient and remainder by repeated doubling of the divisor.
const DIVISION: &str = "\
@entry:
    read %n
    read %m
    %q = 0
    goto @outer
@outer:
    %small = %n < %m
    branch %small ? @done : @double
@double:
    %d = %m
    %p = 1
    goto @grow
@grow:
    %d2 = %d << 1
    %over = %n < %d2
    branch %over ? @apply : @bump
@bump:
    %d = %d2
    %p = %p << 1
    goto @grow
@apply:
    %n = %n - %d
    %q = %q + %p
    goto @outer
@done:
    write %q
    write %n
    exit
";

#[test]
fn s1_division_by_repeated_doubling() {
    assert_eq!(run_program(DIVISION, &[17, 5]), Ok(vec![3, 2]));
    assert_eq!(run_program(DIVISION, &[100, 7]), Ok(vec![14, 2]));
    assert_eq!(run_program(DIVISION, &[3, 5]), Ok(vec![0, 3]));
}

/// a^b mod m by square-and-multiply.
const MODEXP: &str = "\
@entry:
    read %a
    read %b
    read %m
    %r = 1
    %base = %a % %m
    goto @loop
@loop:
    %done = %b == 0
    branch %done ? @out : @step
@step:
    %bit = %b & 1
    branch %bit ? @mul : @next
@mul:
    %r = %r * %base
    %r = %r % %m
    goto @next
@next:
    %base = %base * %base
    %base = %base % %m
    %b = %b >> 1
    goto @loop
@out:
    write %r
    exit
";

#[test]
fn s2_modular_exponentiation() {
    assert_eq!(run_program(MODEXP, &[7, 13, 11]), Ok(vec![2]));
    assert_eq!(run_program(MODEXP, &[2, 10, 1000]), Ok(vec![24]));
    assert_eq!(run_program(MODEXP, &[5, 0, 3]), Ok(vec![1]));
}

/// Smallest a >= 1 with n == a^2 + b^2 and b >= a, else -1.
const SUM_OF_SQUARES: &str = "\
@entry:
    read %n
    %a = 1
    goto @aloop
@aloop:
    %aa = %a * %a
    %rem = %n - %aa
    %stop = %rem < %aa
    branch %stop ? @fail : @binit
@binit:
    %b = %a
    goto @bloop
@bloop:
    %bb = %b * %b
    %hit = %bb == %rem
    branch %hit ? @found : @bnext
@bnext:
    %over = %rem < %bb
    branch %over ? @anext : @bgrow
@bgrow:
    %b = %b + 1
    goto @bloop
@anext:
    %a = %a + 1
    goto @aloop
@found:
    write %a
    write %b
    exit
@fail:
    write -1
    exit
";

#[test]
fn s3_sum_of_squares() {
    assert_eq!(run_program(SUM_OF_SQUARES, &[25]), Ok(vec![3, 4]));
    assert_eq!(run_program(SUM_OF_SQUARES, &[3]), Ok(vec![-1]));
    assert_eq!(run_program(SUM_OF_SQUARES, &[2]), Ok(vec![1, 1]));
}

/// FizzBuzz surrogate with Fizz=5122 (even), Buzz=8422 (multiple of
/// five), FizzBuzz=51228422.
const FIZZBUZZ: &str = "\
@entry:
    read %n
    %i = 1
    goto @loop
@loop:
    %done = %n < %i
    branch %done ? @end : @emit
@emit:
    %f = %i % 2
    %fz = %f == 0
    %g = %i % 5
    %bz = %g == 0
    %both = %fz & %bz
    branch %both ? @fizzbuzz : @tryfizz
@tryfizz:
    branch %fz ? @fizz : @trybuzz
@trybuzz:
    branch %bz ? @buzz : @plain
@fizzbuzz:
    write 51228422
    goto @next
@fizz:
    write 5122
    goto @next
@buzz:
    write 8422
    goto @next
@plain:
    write %f
    goto @next
@next:
    %i = %i + 1
    goto @loop
@end:
    exit
";

#[test]
fn s4_fizzbuzz_surrogate() {
    assert_eq!(
        run_program(FIZZBUZZ, &[5]),
        Ok(vec![1, 5122, 1, 5122, 8422])
    );
    assert_eq!(
        run_program(FIZZBUZZ, &[10]),
        Ok(vec![1, 5122, 1, 5122, 8422, 5122, 1, 5122, 1, 51228422])
    );
}

/// Interactive binary search over [0, 1024): guesses the midpoint,
/// reads -1 (target below), 1 (above), or 0 (found), then acknowledges
/// with 88.
const BINARY_SEARCH: &str = "\
@entry:
    %lo = 0
    %hi = 1024
    goto @loop
@loop:
    %sum = %lo + %hi
    %mid = %sum >> 1
    write %mid
    read %r
    %found = %r == 0
    branch %found ? @done : @narrow
@narrow:
    %below = %r < 0
    branch %below ? @left : @right
@left:
    %hi = %mid
    goto @loop
@right:
    %lo = %mid + 1
    goto @loop
@done:
    write 88
    exit
";

#[test]
fn s5_interactive_binary_search() {
    // Responses scripted to steer the search to 742.
    let responses = [1, -1, 1, 1, 1, -1, -1, 1, 0];
    let output = run_program(BINARY_SEARCH, &responses).unwrap();

    let (last, guesses) = output.split_last().unwrap();
    assert_eq!(*last, 88);
    assert!(guesses.len() <= 10, "took {} guesses", guesses.len());
    assert_eq!(guesses.last(), Some(&742));
    assert_eq!(
        guesses,
        &[512, 768, 640, 704, 736, 752, 744, 740, 742][..]
    );
}

#[test]
fn s6_phi_in_entry_block_is_unbound() {
    let source = "\
@spin:
    %x = phi [1, @spin]
    goto @spin
";
    let err = run_program(source, &[]).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::UnboundPhi {
            block: "spin".to_string()
        }
    );
}

#[test]
fn phi_rows_evaluate_in_parallel() {
    // Swapping phis observe the pre-entry environment regardless of
    // listing order.
    let source = "\
@init:
    %x = 1
    %y = 2
    goto @swap
@swap:
    %x = phi [%y, @init]
    %y = phi [%x, @init]
    write %x
    write %y
    exit
";
    assert_eq!(run_program(source, &[]), Ok(vec![2, 1]));
}

#[test]
fn runs_are_deterministic() {
    let (cfg, _) = parse(DIVISION).unwrap();
    let options = Options {
        trace: true,
        ..Options::default()
    };
    let mut outputs = Vec::new();
    let mut traces = Vec::new();
    for _ in 0..3 {
        let mut interp = Interpreter::new(&cfg, options, CancelToken::new());
        let mut input = VecInput::of(&[1234567, 321]);
        let mut output = VecOutput::new();
        let mut trace = VecTrace::new();
        interp
            .run(&mut input, &mut output, Some(&mut trace))
            .unwrap();
        outputs.push(output.values);
        traces.push(trace.records);
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
    assert_eq!(traces[0], traces[1]);
    assert_eq!(traces[1], traces[2]);
}

#[test]
fn values_are_arbitrary_precision() {
    // 2^200 mod a large prime exercises values far past u64.
    let source = "\
@entry:
    %x = 1
    %i = 0
    goto @loop
@loop:
    %c = %i < 200
    branch %c ? @dbl : @out
@dbl:
    %x = %x << 1
    %i = %i + 1
    goto @loop
@out:
    %x = %x >> 190
    write %x
    exit
";
    assert_eq!(run_program(source, &[]), Ok(vec![1024]));
}
