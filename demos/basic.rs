use tensorqueue::{ Session, Tensor, Uses, Device };

fn main() {
  let mut session: Session<f32> = Session::default();
  println!("{}", session.environment());

  // Weights stay around for every sample, the bias broadcasts over the output
  session.push(Tensor::randn(&[4, 2]), "weights", Uses::Unlimited, false).unwrap();
  session.push(Tensor::zeros(&[1]), "bias", Uses::Unlimited, true).unwrap();

  for _ in 0..3 {
    // Samples line up in the anonymous queue
    session.push_anonymous(Tensor::rand(&[1, 4])).unwrap();
    session.push(Tensor::new(&[1, 2], vec![0.0, 1.0]), "target", Uses::Limited(1), false).unwrap();

    session
      .affine("", "weights", "bias", "logits")
      .softmax("logits", "")
      .cross_entropy("", "target", "loss");

    println!("Loss: {}", session.pop("loss").unwrap());
  }

  // Failures don't interrupt the chain, they are collected instead
  session
    .set_compute(Device::Host)
    .dot("weights", "weights", "");

  for failure in session.take_failures() {
    println!("Failed: {failure}");
  }
}
