mod support;

use sen::error::Error;
use sen::matrix::{Matrix, MatrixStack};
use support::assert_relative_eq;

#[test]
fn identity_leaves_points_alone() {
    let m = Matrix::identity();
    assert_eq!(m.transform_vec2(3.0, 4.0), (3.0, 4.0));
}

#[test]
fn translation_moves_points() {
    let m = Matrix::identity().translated(10.0, 20.0, 0.0);
    assert_eq!(m.transform_vec2(1.0, 2.0), (11.0, 22.0));
}

#[test]
fn scaling_stretches_points() {
    let m = Matrix::identity().scaled(2.0, 3.0, 1.0);
    assert_eq!(m.transform_vec2(4.0, 5.0), (8.0, 15.0));
}

#[test]
fn rotation_quarter_turn() {
    let m = Matrix::identity().rotated_z(std::f32::consts::FRAC_PI_2);
    let (x, y) = m.transform_vec2(1.0, 0.0);
    assert_relative_eq!(x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(y, 1.0, epsilon = 1e-6);
}

#[test]
fn multiply_by_identity_is_identity() {
    let m = Matrix::identity().translated(5.0, 6.0, 7.0);
    let out = Matrix::multiply(&Matrix::identity(), &m);
    assert_eq!(out, m);
}

#[test]
fn translations_compose() {
    let a = Matrix::identity().translated(1.0, 2.0, 0.0);
    let b = Matrix::identity().translated(10.0, 20.0, 0.0);
    let out = Matrix::multiply(&a, &b);
    assert_eq!(out.transform_vec2(0.0, 0.0), (11.0, 22.0));
}

#[test]
fn stack_push_duplicates_and_pop_restores() {
    let mut stack = MatrixStack::new();
    stack.translate(100.0, 0.0);

    stack.push();
    stack.translate(0.0, 50.0);
    assert_eq!(stack.peek().transform_vec2(0.0, 0.0), (100.0, 50.0));

    stack.pop().unwrap();
    assert_eq!(stack.peek().transform_vec2(0.0, 0.0), (100.0, 0.0));
    assert_eq!(stack.depth(), 1);
}

#[test]
fn stack_bottom_cannot_be_popped() {
    let mut stack = MatrixStack::new();
    assert_eq!(stack.pop().unwrap_err(), Error::MatrixStackUnderflow);
}

#[test]
fn stack_reset_returns_to_identity() {
    let mut stack = MatrixStack::new();
    stack.push();
    stack.scale(4.0, 4.0);
    stack.reset();
    assert_eq!(stack.depth(), 1);
    assert_eq!(*stack.peek(), Matrix::identity());
}
