use linmat::{
    domains::float::Tolerance,
    tensors::{
        chain::{ChainOrder, MatrixChain},
        matrix::{Matrix, MatrixError},
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_chain(rng: &mut StdRng, dims: &[usize]) -> MatrixChain<i64> {
    let mut chain = MatrixChain::new();
    for w in dims.windows(2) {
        let m = Matrix::from_sequence(w[0], w[1], (0..w[0] * w[1]).map(|_| rng.gen_range(-3..=3)))
            .unwrap();
        chain.append(m).unwrap();
    }
    chain
}

#[test]
fn every_order_agrees() {
    let mut rng = StdRng::seed_from_u64(5);

    for dims in [
        vec![10, 20, 30, 40],
        vec![30, 35, 15, 5, 10, 20, 25],
        vec![4, 10, 3, 12, 20, 7],
        vec![1, 7, 1, 7, 1],
    ] {
        let chain = random_chain(&mut rng, &dims);
        let p = chain.multiply().unwrap();

        assert_eq!((p.nrows(), p.ncols()), (dims[0], dims[dims.len() - 1]));
        assert_eq!(
            chain.execute(&ChainOrder::left_to_right(&dims)).unwrap(),
            p
        );
        assert_eq!(
            chain.execute(&ChainOrder::right_to_left(&dims)).unwrap(),
            p
        );

        let naive = chain
            .operands()
            .iter()
            .skip(1)
            .fold(chain.operands()[0].clone(), |acc, m| &acc * m);
        assert_eq!(naive, p);
    }
}

#[test]
fn optimal_is_cheapest() {
    let dims = [30, 35, 15, 5, 10, 20, 25];
    let opt = ChainOrder::optimal(&dims);

    assert_eq!(opt.scalar_multiplications(), 15125);
    assert!(opt.scalar_multiplications() <= ChainOrder::left_to_right(&dims).scalar_multiplications());
    assert!(opt.scalar_multiplications() <= ChainOrder::right_to_left(&dims).scalar_multiplications());
}

#[test]
fn determinant_of_product() {
    let mut rng = StdRng::seed_from_u64(13);
    let t = Tolerance::new(1e-9, 1e-12);

    let mut chain = MatrixChain::new();
    let mut expected = 1.;
    for _ in 0..4 {
        let m = Matrix::from_sequence(4, 4, (0..16).map(|_| rng.gen_range(-1.0..1.0))).unwrap();
        expected *= m.determinant().unwrap();
        chain.append(m).unwrap();
    }

    assert!(t.is_close(chain.multiply().unwrap().determinant().unwrap(), expected));
}

#[test]
fn errors() {
    let mut chain = MatrixChain::<f64>::new();
    assert_eq!(chain.multiply(), Err(MatrixError::EmptyChain));

    chain.append(Matrix::new(10, 20).unwrap()).unwrap();
    assert_eq!(
        chain.append(Matrix::new(30, 40).unwrap()),
        Err(MatrixError::DimensionMismatch {
            left: (10, 20),
            right: (30, 40)
        })
    );
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.multiply(), Ok(Matrix::new(10, 20).unwrap()));
}
